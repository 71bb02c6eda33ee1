use crate::models::ImportStatement;
use std::ops::Range;
use tree_sitter::{Node, Parser, Tree};

use super::ParserError;

pub struct PythonParser {
    parser: Parser,
}

impl PythonParser {
    pub fn new() -> Result<Self, ParserError> {
        let mut parser = Parser::new();
        parser
            .set_language(&tree_sitter_python::LANGUAGE.into())
            .map_err(|e| ParserError::InitError(e.to_string()))?;

        Ok(Self { parser })
    }

    /// Parse source code and extract every import statement.
    ///
    /// Sources that do not form a valid module are rejected as a whole; no
    /// partial import list is returned for them.
    pub fn parse(&mut self, source: &str) -> Result<Vec<ImportStatement>, ParserError> {
        let tree = self
            .parser
            .parse(source, None)
            .ok_or_else(|| ParserError::InitError("parser produced no tree".to_string()))?;

        let root = tree.root_node();
        if let Some(bad) = first_error(&root).or_else(|| first_legacy_construct(&root)) {
            let pos = bad.start_position();
            return Err(ParserError::SyntaxError {
                line: pos.row + 1,
                column: pos.column,
            });
        }
        if let Some(offset) = first_stray_text(&root, source) {
            let (line, column) = position_of(source, offset);
            return Err(ParserError::SyntaxError { line, column });
        }

        Ok(self.extract_imports(source, &tree))
    }

    fn extract_imports(&self, source: &str, tree: &Tree) -> Vec<ImportStatement> {
        let mut imports = Vec::new();
        self.traverse_node(&tree.root_node(), source, &mut imports);
        imports
    }

    fn traverse_node(&self, node: &Node, source: &str, imports: &mut Vec<ImportStatement>) {
        match node.kind() {
            "import_statement" => {
                self.parse_import_statement(node, source, imports);
            }
            "import_from_statement" => {
                self.parse_import_from_statement(node, source, imports);
            }
            _ => {
                let mut cursor = node.walk();
                for child in node.children(&mut cursor) {
                    self.traverse_node(&child, source, imports);
                }
            }
        }
    }

    /// Parse `import x, y.z` or `import x as alias`
    fn parse_import_statement(
        &self,
        node: &Node,
        source: &str,
        imports: &mut Vec<ImportStatement>,
    ) {
        let mut cursor = node.walk();
        for child in node.children_by_field_name("name", &mut cursor) {
            let module = match child.kind() {
                "dotted_name" => self.dotted_name(&child, source),
                "aliased_import" => self.aliased_module(&child, source),
                _ => continue,
            };
            imports.push(ImportStatement { module, level: 0 });
        }
    }

    /// Parse `from x import y`, `from . import x` or `from ..x import y`.
    /// Only the source module is recorded; the imported names are irrelevant here.
    fn parse_import_from_statement(
        &self,
        node: &Node,
        source: &str,
        imports: &mut Vec<ImportStatement>,
    ) {
        let Some(module_node) = node.child_by_field_name("module_name") else {
            return;
        };

        let (module, level) = match module_node.kind() {
            "dotted_name" => (self.dotted_name(&module_node, source), 0),
            "relative_import" => self.parse_relative_import(&module_node, source),
            _ => return,
        };

        imports.push(ImportStatement { module, level });
    }

    /// Parse relative import prefix (., .., ...) and the optional module after it
    fn parse_relative_import(&self, node: &Node, source: &str) -> (String, usize) {
        let mut level = 0;
        let mut module = String::new();

        let mut cursor = node.walk();
        for child in node.children(&mut cursor) {
            match child.kind() {
                "import_prefix" => {
                    level = self.get_node_text(&child, source).matches('.').count();
                }
                "dotted_name" => {
                    module = self.dotted_name(&child, source);
                }
                _ => {}
            }
        }

        (module, level.max(1))
    }

    /// Module of an aliased import (`x.y` in `x.y as z`); the alias itself is irrelevant
    fn aliased_module(&self, node: &Node, source: &str) -> String {
        node.child_by_field_name("name")
            .map(|n| self.dotted_name(&n, source))
            .unwrap_or_default()
    }

    /// Join the identifiers of a dotted name, dropping any whitespace between them
    fn dotted_name(&self, node: &Node, source: &str) -> String {
        let mut cursor = node.walk();
        node.children(&mut cursor)
            .filter(|c| c.kind() == "identifier")
            .map(|c| self.get_node_text(&c, source))
            .collect::<Vec<_>>()
            .join(".")
    }

    fn get_node_text<'s>(&self, node: &Node, source: &'s str) -> &'s str {
        &source[node.byte_range()]
    }
}

/// Locate the first ERROR or MISSING node in document order
fn first_error<'t>(node: &Node<'t>) -> Option<Node<'t>> {
    if !node.has_error() {
        return None;
    }
    if node.is_error() || node.is_missing() {
        return Some(*node);
    }
    let mut cursor = node.walk();
    let children: Vec<Node<'t>> = node.children(&mut cursor).collect();
    children
        .iter()
        .find_map(|child| first_error(child))
        .or(Some(*node))
}

/// Python 2 forms the grammar still accepts: `print`/`exec` statements,
/// backtick repr and the `<>` operator
const LEGACY_KINDS: &[&str] = &["print_statement", "exec_statement", "<>", "`"];

fn first_legacy_construct<'t>(node: &Node<'t>) -> Option<Node<'t>> {
    if LEGACY_KINDS.contains(&node.kind()) {
        return Some(*node);
    }
    let mut cursor = node.walk();
    let children: Vec<Node<'t>> = node.children(&mut cursor).collect();
    children.iter().find_map(|child| first_legacy_construct(child))
}

/// Byte offset of the first non-blank text not covered by any token.
/// The lexer drops characters it has no token for (a stray backtick, say)
/// without leaving an ERROR node behind.
fn first_stray_text(root: &Node, source: &str) -> Option<usize> {
    let mut tokens = Vec::new();
    collect_tokens(root, &mut tokens);

    let mut covered = 0;
    for range in tokens.iter().chain(std::iter::once(&(source.len()..source.len()))) {
        if range.start > covered {
            if let Some(offset) = stray_offset(&source[covered..range.start]) {
                return Some(covered + offset);
            }
        }
        covered = covered.max(range.end);
    }
    None
}

/// Leaf byte ranges in document order. Strings count as one token so their
/// contents are never inspected.
fn collect_tokens(node: &Node, tokens: &mut Vec<Range<usize>>) {
    if node.child_count() == 0 || node.kind() == "string" {
        tokens.push(node.byte_range());
        return;
    }
    let mut cursor = node.walk();
    for child in node.children(&mut cursor) {
        collect_tokens(&child, tokens);
    }
}

fn stray_offset(gap: &str) -> Option<usize> {
    gap.char_indices()
        .find(|(_, c)| !(c.is_whitespace() || matches!(c, '\\' | '\u{feff}' | '\u{c}')))
        .map(|(i, _)| i)
}

/// 1-based line and 0-based byte column of `offset`
fn position_of(source: &str, offset: usize) -> (usize, usize) {
    let before = &source[..offset];
    let line_start = before.rfind('\n').map_or(0, |i| i + 1);
    (before.matches('\n').count() + 1, offset - line_start)
}
