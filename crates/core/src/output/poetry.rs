use crate::models::DependencyMapping;

/// Lowest Python version declared in the dependency table
pub const MIN_PYTHON_VERSION: &str = "3.6";

/// Render a `[tool.poetry.dependencies]` table with caret constraints,
/// `*` for unknown versions
pub fn to_poetry(mapping: &DependencyMapping) -> String {
    let mut output = String::from("[tool.poetry.dependencies]\n");
    output.push_str(&format!("python = \"^{}\"\n", MIN_PYTHON_VERSION));
    for (name, version) in mapping {
        match version.as_known() {
            Some(v) => output.push_str(&format!("{} = \"^{}\"\n", name, v)),
            None => output.push_str(&format!("{} = \"*\"\n", name)),
        }
    }
    output
}
