// Module Resolver for Lark LSP
// Maps dotted module paths to known documents by filename suffix, and back

use rustc_hash::FxHashSet;
use tower_lsp::lsp_types::Url;

/// Resolves `a.b.c` to the first known document whose path ends with `a/b/c.<ext>`
#[derive(Debug, Clone)]
pub struct ModuleResolver {
    extension: String,
}

impl ModuleResolver {
    pub fn new(extension: &str) -> Self {
        Self {
            extension: extension.trim_start_matches('.').to_string(),
        }
    }

    /// `math.vector` -> `math/vector.lark`
    pub fn expected_suffix(&self, module_path: &str) -> String {
        let segments: Vec<&str> = module_path.split('.').collect();
        format!("{}.{}", segments.join("/"), self.extension)
    }

    /// First match in iteration order wins; callers pass documents in scan order.
    /// The suffix must start at a path segment boundary (`mymath.lark` is not `math.lark`).
    pub fn resolve<'u>(
        &self,
        module_path: &str,
        documents: impl IntoIterator<Item = &'u Url>,
    ) -> Option<&'u Url> {
        if module_path.is_empty() {
            return None;
        }
        let suffix = self.expected_suffix(module_path);
        documents.into_iter().find(|doc| {
            let path = doc.path();
            match path.strip_suffix(suffix.as_str()) {
                Some(head) => head.is_empty() || head.ends_with('/'),
                None => false,
            }
        })
    }

    /// Dotted module path of a document: relative to the first root containing it,
    /// or just the file stem when no root does.
    pub fn module_path_of(&self, document: &Url, roots: &[Url]) -> String {
        let path = document.path();
        let relative = roots
            .iter()
            .find_map(|root| {
                let root_path = root.path().trim_end_matches('/');
                path.strip_prefix(root_path)?.strip_prefix('/')
            })
            .unwrap_or_else(|| path.rsplit('/').next().unwrap_or(path));

        let dotted_ext = format!(".{}", self.extension);
        let without_ext = relative.strip_suffix(dotted_ext.as_str()).unwrap_or(relative);
        without_ext.replace('/', ".")
    }

    /// Distinct first segments of every known module path
    pub fn namespace_roots<'u>(
        &self,
        documents: impl IntoIterator<Item = &'u Url>,
        roots: &[Url],
    ) -> FxHashSet<String> {
        documents
            .into_iter()
            .filter_map(|doc| {
                let module = self.module_path_of(doc, roots);
                module.split('.').next().filter(|s| !s.is_empty()).map(str::to_string)
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn url(path: &str) -> Url {
        Url::parse(&format!("file://{}", path)).unwrap()
    }

    #[test]
    fn test_expected_suffix() {
        let resolver = ModuleResolver::new("lark");
        assert_eq!(resolver.expected_suffix("math.vector"), "math/vector.lark");
        assert_eq!(resolver.expected_suffix("io"), "io.lark");
    }

    #[test]
    fn test_resolve_by_suffix() {
        let resolver = ModuleResolver::new(".lark");
        let docs = vec![url("/ws/src/main.lark"), url("/ws/src/math/vector.lark")];
        assert_eq!(resolver.resolve("math.vector", &docs), Some(&docs[1]));
        assert_eq!(resolver.resolve("vector", &docs), Some(&docs[1]));
        assert_eq!(resolver.resolve("main", &docs), Some(&docs[0]));
        assert_eq!(resolver.resolve("mathlib", &docs), None);
        assert_eq!(resolver.resolve("", &docs), None);
    }

    #[test]
    fn test_resolve_requires_segment_boundary() {
        let resolver = ModuleResolver::new("lark");
        let docs = vec![url("/ws/mymath.lark")];
        assert_eq!(resolver.resolve("math", &docs), None);
    }

    #[test]
    fn test_ambiguous_resolves_to_first() {
        let resolver = ModuleResolver::new("lark");
        let docs = vec![url("/ws/a/util.lark"), url("/ws/b/util.lark")];
        assert_eq!(resolver.resolve("util", &docs), Some(&docs[0]));
        let reversed: Vec<Url> = docs.iter().rev().cloned().collect();
        assert_eq!(resolver.resolve("util", &reversed), Some(&reversed[0]));
    }

    #[test]
    fn test_module_path_of() {
        let resolver = ModuleResolver::new("lark");
        let roots = vec![url("/ws/")];
        assert_eq!(resolver.module_path_of(&url("/ws/math/vector.lark"), &roots), "math.vector");
        assert_eq!(resolver.module_path_of(&url("/ws/main.lark"), &roots), "main");
        assert_eq!(resolver.module_path_of(&url("/elsewhere/tools.lark"), &roots), "tools");
        assert_eq!(resolver.module_path_of(&url("/elsewhere/tools.lark"), &[]), "tools");
    }

    #[test]
    fn test_namespace_roots() {
        let resolver = ModuleResolver::new("lark");
        let roots = vec![url("/ws")];
        let docs = vec![
            url("/ws/math/vector.lark"),
            url("/ws/math/matrix.lark"),
            url("/ws/io.lark"),
        ];
        let found = resolver.namespace_roots(&docs, &roots);
        assert_eq!(found.len(), 2);
        assert!(found.contains("math"));
        assert!(found.contains("io"));
    }
}
