use crate::models::DependencyMapping;

/// Render a pip requirements file: `name==version`, or the bare name when
/// the version is unknown
pub fn to_pip(mapping: &DependencyMapping) -> String {
    let mut output = String::new();
    for (name, version) in mapping {
        match version.as_known() {
            Some(v) => output.push_str(&format!("{}=={}\n", name, v)),
            None => output.push_str(&format!("{}\n", name)),
        }
    }
    output
}
