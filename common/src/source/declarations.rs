//! Lowering of logical lines into module-level declarations.

use super::blocks::top_level_colon;
use super::scanner::LogicalLine;

/// An `import` or `from … import …` statement.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ImportDecl {
    module: String,
    names: Vec<String>,
    line: usize,
}

impl ImportDecl {
    /// Dotted module path, e.g. `urllib.parse`. Relative imports keep their
    /// leading dots.
    #[must_use]
    pub fn module(&self) -> &str {
        &self.module
    }

    /// First path segment, e.g. `urllib`.
    #[must_use]
    pub fn top_level(&self) -> &str {
        self.module.split('.').next().unwrap_or_default()
    }

    /// Names pulled in by a `from` import; empty for plain imports.
    #[must_use]
    pub fn names(&self) -> &[String] {
        &self.names
    }

    /// Whether this is a `from … import …` statement.
    #[must_use]
    pub fn is_from(&self) -> bool {
        !self.names.is_empty()
    }

    /// One-based line of the statement.
    #[must_use]
    pub const fn line(&self) -> usize {
        self.line
    }
}

/// Explicit marker carried by methods decorated as publicly exposed.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PublicMarker {
    /// `@gl.public.view` methods are read-only.
    pub readonly: bool,
    /// `@gl.public.write.payable` methods accept value.
    pub payable: bool,
}

impl PublicMarker {
    /// Derives a marker from a decorator path such as `gl.public.write`.
    ///
    /// Returns `None` for decorators that do not expose the method.
    #[must_use]
    pub fn from_decorator(path: &str) -> Option<Self> {
        let segments: Vec<&str> = path.split('.').collect();
        let public_at = segments.iter().position(|&segment| segment == "public")?;
        if public_at > 1 || (public_at == 1 && segments.first() != Some(&"gl")) {
            return None;
        }
        let rest = segments.get(public_at + 1..).unwrap_or_default();
        Some(Self {
            readonly: rest.first() == Some(&"view"),
            payable: rest.contains(&"payable"),
        })
    }
}

/// Kind of a function parameter.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ParamKind {
    /// Positional-or-keyword.
    Positional,
    /// `*args`.
    VarArgs,
    /// Keyword-only, declared after `*` or `*args`.
    KeywordOnly,
    /// `**kwargs`.
    VarKeywords,
}

/// A function parameter.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ParamDecl {
    name: String,
    annotation: Option<String>,
    default: Option<String>,
    kind: ParamKind,
}

impl ParamDecl {
    /// Parameter name without star prefixes.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Annotation source text, if annotated.
    #[must_use]
    pub fn annotation(&self) -> Option<&str> {
        self.annotation.as_deref()
    }

    /// Default value source text, if any.
    #[must_use]
    pub fn default(&self) -> Option<&str> {
        self.default.as_deref()
    }

    /// Parameter kind.
    #[must_use]
    pub const fn kind(&self) -> ParamKind {
        self.kind
    }
}

/// A method declared directly in a class body.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MethodDecl {
    name: String,
    params: Vec<ParamDecl>,
    returns: Option<String>,
    decorators: Vec<String>,
    marker: Option<PublicMarker>,
    line: usize,
}

impl MethodDecl {
    /// Method name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Parameters, excluding the receiver (`self`/`cls`).
    #[must_use]
    pub fn params(&self) -> &[ParamDecl] {
        &self.params
    }

    /// Return annotation source text.
    #[must_use]
    pub fn returns(&self) -> Option<&str> {
        self.returns.as_deref()
    }

    /// Decorator paths with call arguments removed.
    #[must_use]
    pub fn decorators(&self) -> &[String] {
        &self.decorators
    }

    /// Public exposure marker, if the method is exposed.
    #[must_use]
    pub const fn marker(&self) -> Option<PublicMarker> {
        self.marker
    }

    /// One-based line of the `def`.
    #[must_use]
    pub const fn line(&self) -> usize {
        self.line
    }
}

/// An annotated attribute in a class body, e.g. `owner: Address`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FieldDecl {
    name: String,
    annotation: String,
    line: usize,
}

impl FieldDecl {
    /// Field name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Annotation source text.
    #[must_use]
    pub fn annotation(&self) -> &str {
        &self.annotation
    }

    /// One-based line of the declaration.
    #[must_use]
    pub const fn line(&self) -> usize {
        self.line
    }
}

/// A top-level class.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ClassDecl {
    name: String,
    bases: Vec<String>,
    decorators: Vec<String>,
    methods: Vec<MethodDecl>,
    fields: Vec<FieldDecl>,
    line: usize,
}

impl ClassDecl {
    /// Class name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Base expressions as written, e.g. `gl.Contract`.
    #[must_use]
    pub fn bases(&self) -> &[String] {
        &self.bases
    }

    /// Decorator paths applied to the class.
    #[must_use]
    pub fn decorators(&self) -> &[String] {
        &self.decorators
    }

    /// Methods in declaration order.
    #[must_use]
    pub fn methods(&self) -> &[MethodDecl] {
        &self.methods
    }

    /// Annotated fields in declaration order.
    #[must_use]
    pub fn fields(&self) -> &[FieldDecl] {
        &self.fields
    }

    /// Looks up a method by name.
    #[must_use]
    pub fn method(&self, name: &str) -> Option<&MethodDecl> {
        self.methods.iter().find(|method| method.name == name)
    }

    /// Whether any method carries a [`PublicMarker`].
    #[must_use]
    pub fn has_public_methods(&self) -> bool {
        self.methods.iter().any(|method| method.marker.is_some())
    }

    /// One-based line of the `class` statement.
    #[must_use]
    pub const fn line(&self) -> usize {
        self.line
    }
}

/// Declarations found in a contract module.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ContractModule {
    imports: Vec<ImportDecl>,
    classes: Vec<ClassDecl>,
}

impl ContractModule {
    /// Every import statement, at any nesting level.
    #[must_use]
    pub fn imports(&self) -> &[ImportDecl] {
        &self.imports
    }

    /// Top-level classes in declaration order.
    #[must_use]
    pub fn classes(&self) -> &[ClassDecl] {
        &self.classes
    }

    /// Looks up a top-level class by name.
    #[must_use]
    pub fn class(&self, name: &str) -> Option<&ClassDecl> {
        self.classes.iter().find(|class| class.name == name)
    }

    /// Whether `class` derives from a base named `base_name`, following base
    /// classes declared in this module.
    #[must_use]
    pub fn inherits_from(&self, class: &ClassDecl, base_name: &str) -> bool {
        let mut pending: Vec<&ClassDecl> = vec![class];
        let mut seen: Vec<&str> = Vec::new();
        while let Some(current) = pending.pop() {
            if seen.contains(&current.name.as_str()) {
                continue;
            }
            seen.push(&current.name);
            for base in &current.bases {
                let simple = base.rsplit('.').next().unwrap_or(base);
                if simple == base_name {
                    return true;
                }
                if let Some(parent) = self.class(simple) {
                    pending.push(parent);
                }
            }
        }
        false
    }
}

struct OpenClass {
    decl: ClassDecl,
    indent: usize,
    body_indent: Option<usize>,
}

pub(super) fn lower(lines: &[LogicalLine]) -> ContractModule {
    let mut module = ContractModule::default();
    let mut open: Option<OpenClass> = None;
    let mut decorators: Vec<String> = Vec::new();

    for line in lines {
        let text = line.text();
        module.imports.extend(parse_import(text, line.line()));

        if let Some(class) = open.as_mut() {
            if line.indent() > class.indent {
                let body = *class.body_indent.get_or_insert(line.indent());
                if line.indent() == body {
                    lower_class_member(&mut class.decl, line, &mut decorators);
                }
                continue;
            }
            if let Some(done) = open.take() {
                module.classes.push(done.decl);
            }
        }

        if line.indent() != 0 {
            continue;
        }
        if let Some(path) = decorator_path(text) {
            decorators.push(path);
        } else if let Some((name, bases)) = parse_class_header(text) {
            open = Some(OpenClass {
                decl: ClassDecl {
                    name,
                    bases,
                    decorators: std::mem::take(&mut decorators),
                    methods: Vec::new(),
                    fields: Vec::new(),
                    line: line.line(),
                },
                indent: line.indent(),
                body_indent: None,
            });
        } else {
            decorators.clear();
        }
    }

    if let Some(done) = open {
        module.classes.push(done.decl);
    }
    module
}

fn lower_class_member(class: &mut ClassDecl, line: &LogicalLine, decorators: &mut Vec<String>) {
    let text = line.text();
    if let Some(path) = decorator_path(text) {
        decorators.push(path);
        return;
    }
    let taken = std::mem::take(decorators);
    if let Some(method) = parse_def(text, line.line(), taken) {
        class.methods.push(method);
    } else if let Some(field) = parse_field(text, line.line()) {
        class.fields.push(field);
    }
}

fn decorator_path(text: &str) -> Option<String> {
    let body = text.strip_prefix('@')?.trim();
    let path = body.split('(').next().unwrap_or(body).trim();
    Some(path.to_owned())
}

fn parse_import(text: &str, line: usize) -> Vec<ImportDecl> {
    if let Some(rest) = text.strip_prefix("import ") {
        return split_top_level(rest, ',')
            .into_iter()
            .filter_map(|item| {
                let module = item.split(" as ").next().unwrap_or(item).trim();
                (!module.is_empty()).then(|| ImportDecl {
                    module: module.to_owned(),
                    names: Vec::new(),
                    line,
                })
            })
            .collect();
    }
    let Some(rest) = text.strip_prefix("from ") else {
        return Vec::new();
    };
    let Some((module, names)) = rest.split_once(" import ") else {
        return Vec::new();
    };
    let names = names.trim().trim_start_matches('(').trim_end_matches(')');
    let names: Vec<String> = split_top_level(names, ',')
        .into_iter()
        .map(|name| name.split(" as ").next().unwrap_or(name).trim().to_owned())
        .filter(|name| !name.is_empty())
        .collect();
    vec![ImportDecl {
        module: module.trim().to_owned(),
        names,
        line,
    }]
}

fn parse_class_header(text: &str) -> Option<(String, Vec<String>)> {
    let rest = text.strip_prefix("class ")?.trim_start();
    let name_end = rest
        .find(|ch: char| !(ch.is_alphanumeric() || ch == '_'))
        .unwrap_or(rest.len());
    let name = rest.get(..name_end)?.to_owned();
    let after = rest.get(name_end..)?.trim_start();
    let bases = match after.strip_prefix('(') {
        Some(inner) => {
            let close = matching_paren(inner)?;
            split_top_level(inner.get(..close)?, ',')
                .into_iter()
                .filter(|base| !base.is_empty() && !base.contains('='))
                .map(ToOwned::to_owned)
                .collect()
        }
        None => Vec::new(),
    };
    Some((name, bases))
}

fn parse_def(text: &str, line: usize, decorators: Vec<String>) -> Option<MethodDecl> {
    let text = text.strip_prefix("async ").map_or(text, str::trim_start);
    let rest = text.strip_prefix("def ")?.trim_start();
    let open = rest.find('(')?;
    let name = rest.get(..open)?.trim().to_owned();
    let inner = rest.get(open + 1..)?;
    let close = matching_paren(inner)?;
    let params = parse_params(inner.get(..close)?);
    let tail = inner.get(close + 1..)?;
    let returns = tail.trim_start().strip_prefix("->").and_then(|ret| {
        let end = top_level_colon(ret).unwrap_or(ret.len());
        let annotation = ret.get(..end)?.trim();
        (!annotation.is_empty()).then(|| annotation.to_owned())
    });
    let marker = decorators
        .iter()
        .find_map(|path| PublicMarker::from_decorator(path));
    Some(MethodDecl {
        name,
        params,
        returns,
        decorators,
        marker,
        line,
    })
}

fn parse_params(list: &str) -> Vec<ParamDecl> {
    let mut params = Vec::new();
    let mut keyword_only = false;
    for (index, raw) in split_top_level(list, ',').into_iter().enumerate() {
        if raw.is_empty() || raw == "/" {
            continue;
        }
        if raw == "*" {
            keyword_only = true;
            continue;
        }
        let (head, default) = match split_once_top_level(raw, '=') {
            Some((head, default)) => (head.trim(), Some(default.trim().to_owned())),
            None => (raw, None),
        };
        let (name, annotation) = match split_once_top_level(head, ':') {
            Some((name, annotation)) => (name.trim(), Some(annotation.trim().to_owned())),
            None => (head, None),
        };
        let (name, kind) = if let Some(name) = name.strip_prefix("**") {
            (name, ParamKind::VarKeywords)
        } else if let Some(name) = name.strip_prefix('*') {
            keyword_only = true;
            (name, ParamKind::VarArgs)
        } else if keyword_only {
            (name, ParamKind::KeywordOnly)
        } else {
            (name, ParamKind::Positional)
        };
        if index == 0 && matches!(name, "self" | "cls") && kind == ParamKind::Positional {
            continue;
        }
        params.push(ParamDecl {
            name: name.to_owned(),
            annotation,
            default,
            kind,
        });
    }
    params
}

fn parse_field(text: &str, line: usize) -> Option<FieldDecl> {
    let (name, annotation) = split_once_top_level(text, ':')?;
    let name = name.trim();
    if name.is_empty() || !name.chars().all(|ch| ch.is_alphanumeric() || ch == '_') {
        return None;
    }
    let annotation = match split_once_top_level(annotation, '=') {
        Some((annotation, _)) => annotation,
        None => annotation,
    };
    Some(FieldDecl {
        name: name.to_owned(),
        annotation: annotation.trim().to_owned(),
        line,
    })
}

/// Index of the `)` closing a group whose `(` precedes `inner`.
fn matching_paren(inner: &str) -> Option<usize> {
    let mut depth = 0_usize;
    for (pos, ch) in inner.char_indices() {
        match ch {
            '(' | '[' | '{' => depth += 1,
            ')' if depth == 0 => return Some(pos),
            ')' | ']' | '}' => depth = depth.saturating_sub(1),
            _ => {}
        }
    }
    None
}

fn split_top_level(text: &str, separator: char) -> Vec<&str> {
    let mut parts = Vec::new();
    let mut depth = 0_usize;
    let mut start = 0;
    for (pos, ch) in text.char_indices() {
        match ch {
            '(' | '[' | '{' => depth += 1,
            ')' | ']' | '}' => depth = depth.saturating_sub(1),
            c if c == separator && depth == 0 => {
                parts.push(text.get(start..pos).unwrap_or_default().trim());
                start = pos + c.len_utf8();
            }
            _ => {}
        }
    }
    parts.push(text.get(start..).unwrap_or_default().trim());
    parts
}

fn split_once_top_level(text: &str, separator: char) -> Option<(&str, &str)> {
    let mut depth = 0_usize;
    for (pos, ch) in text.char_indices() {
        match ch {
            '(' | '[' | '{' => depth += 1,
            ')' | ']' | '}' => depth = depth.saturating_sub(1),
            c if c == separator && depth == 0 => {
                let tail = text.get(pos + c.len_utf8()..)?;
                if separator == '=' && tail.starts_with('=') {
                    return None;
                }
                return Some((text.get(..pos)?, tail));
            }
            _ => {}
        }
    }
    None
}
