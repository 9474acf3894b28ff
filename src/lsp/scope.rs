// Scope Engine for Lark LSP
// Context state machine and scope stack driving declaration/usage classification.
//
// Transition table (state stack base is Normal and is never popped):
//
//   event                      effect
//   -------------------------  ---------------------------------------------------
//   keyword in ImportStmt      pop ImportStmt first, unless `from`/`as`
//   `import`                   push ImportStmt
//   declaration keyword        remember it; `fun`/`class` arm the argument list,
//                              `type`/`enum` open their declaration,
//                              `extern` pushes ExternDecl
//   other keyword              disarm the argument list
//   `->`                       push ReturnType
//   `{` in ImportStmt          push ImportStmt, no scope
//   `{`                        pop ReturnType; open a scope with the buffered
//                              parameters; push a state picked by look-back
//   `}` in ImportStmt          pop ImportStmt, then the enclosing one
//   `}`                        pop a scope and a state
//   `(` armed                  push FunArgs, disarm
//   `(` after `extern`         push ExternAbi
//   `(` in ExternDecl          push FunArgs
//   `)`                        pop FunArgs or ExternAbi
//   `;`                        pop ImportStmt or ReturnType, then ExternDecl;
//                              clear buffered parameters and open declarations

use rustc_hash::FxHashSet;

use super::lexer::{Keyword, Token, TokenKind};

/// Syntactic context of the current position
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Context {
    Normal,
    FunArgs,
    StructBody,
    ObjectLiteral,
    ImportStmt,
    ReturnType,
    ExternDecl,
    ExternAbi,
    EnumBody,
}

/// The previous significant token, as far as the machine cares
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Prev {
    Start,
    Keyword(Keyword),
    Identifier,
    Punct(char),
    Literal,
    Arrow,
}

impl Prev {
    pub fn of(token: Option<&Token<'_>>) -> Self {
        match token.map(|t| t.kind) {
            None => Prev::Start,
            Some(TokenKind::Keyword(kw)) => Prev::Keyword(kw),
            Some(TokenKind::Identifier) => Prev::Identifier,
            Some(TokenKind::Punct(c)) => Prev::Punct(c),
            Some(TokenKind::Arrow) => Prev::Arrow,
            Some(TokenKind::String) | Some(TokenKind::Number) => Prev::Literal,
        }
    }

    /// Tokens after which `{` starts a value rather than a block
    fn opens_value(&self) -> bool {
        matches!(
            self,
            Prev::Punct('=' | '(' | ',' | ':' | '[') | Prev::Keyword(Keyword::Return)
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Event {
    Keyword(Keyword),
    Arrow,
    OpenBrace(Prev),
    CloseBrace,
    OpenParen(Prev),
    CloseParen,
    Semicolon,
}

impl Event {
    /// The event a token triggers, if any; `prev` is the token before it
    pub fn of(token: &Token<'_>, prev: Prev) -> Option<Self> {
        match token.kind {
            TokenKind::Keyword(kw) => Some(Event::Keyword(kw)),
            TokenKind::Arrow => Some(Event::Arrow),
            TokenKind::Punct('{') => Some(Event::OpenBrace(prev)),
            TokenKind::Punct('}') => Some(Event::CloseBrace),
            TokenKind::Punct('(') => Some(Event::OpenParen(prev)),
            TokenKind::Punct(')') => Some(Event::CloseParen),
            TokenKind::Punct(';') => Some(Event::Semicolon),
            _ => None,
        }
    }
}

/// What the scope stack must do after a transition
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect {
    None,
    OpenScope(Vec<String>),
    CloseScope,
}

/// How an identifier is treated
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IdentClass {
    /// `a.b`: `b` is never checked
    Member,
    /// Module paths, return types, ABI strings, enum variants
    NonSemantic,
    Declaration,
    ExternName,
    TypeRef,
    Parameter,
    Label,
    Usage,
}

/// Look-around facts the classifier needs about one identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IdentSite {
    pub prev: Prev,
    /// Previous token is a `.` that is not part of `...`
    pub after_dot: bool,
    pub next_is_colon: bool,
}

#[derive(Debug, Clone)]
pub struct ContextMachine {
    states: Vec<Context>,
    last_decl_keyword: Option<Keyword>,
    expecting_args: bool,
    type_decl_open: bool,
    enum_decl_open: bool,
    pending_params: Vec<String>,
}

impl Default for ContextMachine {
    fn default() -> Self {
        Self::new()
    }
}

impl ContextMachine {
    pub fn new() -> Self {
        Self {
            states: vec![Context::Normal],
            last_decl_keyword: None,
            expecting_args: false,
            type_decl_open: false,
            enum_decl_open: false,
            pending_params: Vec::new(),
        }
    }

    pub fn current(&self) -> Context {
        self.states.last().copied().unwrap_or(Context::Normal)
    }

    pub fn depth(&self) -> usize {
        self.states.len()
    }

    pub fn last_decl_keyword(&self) -> Option<Keyword> {
        self.last_decl_keyword
    }

    pub fn pending_params(&self) -> &[String] {
        &self.pending_params
    }

    pub fn buffer_param(&mut self, name: &str) {
        self.pending_params.push(name.to_string());
    }

    fn push(&mut self, state: Context) {
        self.states.push(state);
    }

    fn pop(&mut self) {
        if self.states.len() > 1 {
            self.states.pop();
        }
    }

    fn pop_if(&mut self, state: Context) -> bool {
        if self.current() == state && self.states.len() > 1 {
            self.states.pop();
            true
        } else {
            false
        }
    }

    pub fn step(&mut self, event: Event) -> Effect {
        match event {
            Event::Keyword(kw) => {
                self.on_keyword(kw);
                Effect::None
            }
            Event::Arrow => {
                self.push(Context::ReturnType);
                Effect::None
            }
            Event::OpenBrace(prev) => self.on_open_brace(prev),
            Event::CloseBrace => {
                if self.current() == Context::ImportStmt {
                    self.pop();
                    self.pop_if(Context::ImportStmt);
                    return Effect::None;
                }
                self.pop();
                Effect::CloseScope
            }
            Event::OpenParen(prev) => {
                if self.expecting_args {
                    self.expecting_args = false;
                    self.push(Context::FunArgs);
                } else if self.current() == Context::ExternDecl {
                    if prev == Prev::Keyword(Keyword::Extern) {
                        self.push(Context::ExternAbi);
                    } else {
                        self.push(Context::FunArgs);
                    }
                }
                Effect::None
            }
            Event::CloseParen => {
                if !self.pop_if(Context::FunArgs) {
                    self.pop_if(Context::ExternAbi);
                }
                Effect::None
            }
            Event::Semicolon => {
                if !self.pop_if(Context::ImportStmt) {
                    self.pop_if(Context::ReturnType);
                }
                self.pop_if(Context::ExternDecl);
                self.pending_params.clear();
                self.type_decl_open = false;
                self.enum_decl_open = false;
                self.expecting_args = false;
                Effect::None
            }
        }
    }

    fn on_keyword(&mut self, kw: Keyword) {
        if self.current() == Context::ImportStmt && !matches!(kw, Keyword::From | Keyword::As) {
            self.pop();
        }

        self.expecting_args = matches!(kw, Keyword::Fun | Keyword::Class);
        match kw {
            Keyword::Import => self.push(Context::ImportStmt),
            Keyword::Type => self.type_decl_open = true,
            Keyword::Enum => self.enum_decl_open = true,
            Keyword::Extern => self.push(Context::ExternDecl),
            _ => {}
        }
        if kw.is_declaration() {
            self.last_decl_keyword = Some(kw);
        }
    }

    fn on_open_brace(&mut self, prev: Prev) -> Effect {
        if self.current() == Context::ImportStmt {
            self.push(Context::ImportStmt);
            return Effect::None;
        }

        self.pop_if(Context::ReturnType);
        let params = std::mem::take(&mut self.pending_params);

        let state = if self.type_decl_open
            && matches!(prev, Prev::Keyword(Keyword::Type) | Prev::Identifier | Prev::Punct('='))
        {
            Context::StructBody
        } else if self.enum_decl_open && matches!(prev, Prev::Punct('=') | Prev::Identifier) {
            Context::EnumBody
        } else if prev.opens_value() {
            Context::ObjectLiteral
        } else {
            Context::Normal
        };

        self.push(state);
        self.type_decl_open = false;
        self.enum_decl_open = false;
        self.expecting_args = false;
        Effect::OpenScope(params)
    }

    /// Rules are tried in order; the first that applies wins
    pub fn classify(&self, site: IdentSite) -> IdentClass {
        let state = self.current();
        if site.after_dot {
            return IdentClass::Member;
        }
        if matches!(
            state,
            Context::ImportStmt | Context::ReturnType | Context::ExternAbi | Context::EnumBody
        ) {
            return IdentClass::NonSemantic;
        }
        let declares = match site.prev {
            Prev::Keyword(kw) => kw.is_declaration() || kw == Keyword::For,
            Prev::Identifier => true,
            _ => false,
        };
        if declares {
            return IdentClass::Declaration;
        }
        match state {
            Context::ExternDecl => IdentClass::ExternName,
            Context::FunArgs if site.next_is_colon => IdentClass::TypeRef,
            Context::FunArgs => IdentClass::Parameter,
            Context::StructBody | Context::ObjectLiteral if site.next_is_colon => IdentClass::Label,
            _ => IdentClass::Usage,
        }
    }
}

/// Lexical scopes, innermost last; the global scope is never popped
#[derive(Debug, Clone)]
pub struct ScopeStack {
    scopes: Vec<FxHashSet<String>>,
}

impl ScopeStack {
    pub fn new(global: FxHashSet<String>) -> Self {
        Self { scopes: vec![global] }
    }

    pub fn open(&mut self, names: Vec<String>) {
        self.scopes.push(names.into_iter().collect());
    }

    pub fn close(&mut self) {
        if self.scopes.len() > 1 {
            self.scopes.pop();
        }
    }

    pub fn apply(&mut self, effect: Effect) {
        match effect {
            Effect::None => {}
            Effect::OpenScope(names) => self.open(names),
            Effect::CloseScope => self.close(),
        }
    }

    pub fn declare(&mut self, name: &str) {
        if let Some(scope) = self.scopes.last_mut() {
            scope.insert(name.to_string());
        }
    }

    pub fn resolves(&self, name: &str) -> bool {
        self.scopes.iter().rev().any(|scope| scope.contains(name))
    }

    pub fn depth(&self) -> usize {
        self.scopes.len()
    }
}
