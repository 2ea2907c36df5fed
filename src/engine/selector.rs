//! Target selection
//!
//! Filters the caller-supplied file list down to the files one hook cares
//! about: include globs, exclude path prefixes (version-control and
//! dependency directories by default), and a content sniff for formats an
//! extension alone cannot identify. An empty selection is the normal
//! "nothing to check" case, not an error.

use crate::engine::spec::{ContentSniff, SelectionSpec};
use anyhow::Result;
use globset::{Glob, GlobSet, GlobSetBuilder};
use std::path::{Path, PathBuf};
use tracing::debug;

/// YAML keys that mark a document as Ansible content
const ANSIBLE_INDICATORS: &[&str] = &[
    "hosts",
    "tasks",
    "handlers",
    "roles",
    "vars",
    "become",
    "gather_facts",
    "connection",
];

/// Select the order-preserving subset of `files` relevant to `spec`.
///
/// `extra_excludes` carries the engine-wide exclusion prefixes from config;
/// `project_root` anchors relative paths for content sniffing.
pub fn select(
    files: &[PathBuf],
    spec: &SelectionSpec,
    extra_excludes: &[String],
    project_root: &Path,
) -> Result<Vec<PathBuf>> {
    let includes = build_globset(&spec.include)?;
    let mut selected = Vec::new();

    for file in files {
        let normalized = normalize(file);
        if !includes.is_match(&normalized) {
            continue;
        }
        if is_excluded(&normalized, &spec.exclude_prefixes)
            || is_excluded(&normalized, extra_excludes)
        {
            continue;
        }
        if let Some(sniff) = spec.sniff {
            let absolute = if file.is_absolute() {
                file.clone()
            } else {
                project_root.join(file)
            };
            match std::fs::read_to_string(&absolute) {
                Ok(content) => {
                    if !sniff_matches(sniff, &content) {
                        continue;
                    }
                }
                // Unreadable or binary content can't match a text heuristic
                Err(_) => continue,
            }
        }
        selected.push(file.clone());
    }

    debug!(
        total = files.len(),
        selected = selected.len(),
        "target selection completed"
    );
    Ok(selected)
}

/// Compile include patterns into a single matcher
pub fn build_globset(patterns: &[String]) -> Result<GlobSet> {
    let mut builder = GlobSetBuilder::new();
    for pattern in patterns {
        builder.add(Glob::new(pattern)?);
    }
    Ok(builder.build()?)
}

fn normalize(path: &Path) -> String {
    path.to_string_lossy().replace('\\', "/")
}

fn is_excluded(normalized: &str, prefixes: &[String]) -> bool {
    prefixes.iter().any(|prefix| {
        let prefix = prefix.trim_end_matches('/');
        normalized == prefix
            || normalized.starts_with(&format!("{prefix}/"))
            || normalized.contains(&format!("/{prefix}/"))
    })
}

/// Content heuristic for ambiguous extensions. Documented per variant so
/// the behavior is testable instead of scattered per hook.
pub fn sniff_matches(sniff: ContentSniff, content: &str) -> bool {
    match sniff {
        ContentSniff::AnsibleYaml => looks_like_ansible(content),
        ContentSniff::XmlDocument => {
            let head = content.trim_start();
            head.starts_with("<?xml") || head.starts_with('<')
        }
    }
}

/// A YAML file is Ansible content when a play/task-level indicator key shows
/// up in the parsed document. Unparseable YAML falls back to a raw-text scan
/// so templated playbooks (invalid YAML until rendered) are still caught.
fn looks_like_ansible(content: &str) -> bool {
    match serde_yml::from_str::<serde_yml::Value>(content) {
        Ok(value) => yaml_has_indicator(&value),
        Err(_) => {
            let lower = content.to_lowercase();
            ANSIBLE_INDICATORS
                .iter()
                .any(|key| lower.contains(&format!("{key}:")))
                || lower.contains("ansible_")
        }
    }
}

fn yaml_has_indicator(value: &serde_yml::Value) -> bool {
    match value {
        serde_yml::Value::Mapping(map) => map.iter().any(|(key, nested)| {
            key.as_str()
                .map(|k| ANSIBLE_INDICATORS.contains(&k) || k.starts_with("ansible_"))
                .unwrap_or(false)
                || yaml_has_indicator(nested)
        }),
        serde_yml::Value::Sequence(items) => items.iter().any(yaml_has_indicator),
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn paths(names: &[&str]) -> Vec<PathBuf> {
        names.iter().map(PathBuf::from).collect()
    }

    #[test]
    fn test_include_globs() {
        let spec = SelectionSpec::new(&["**/*.rs"]);
        let files = paths(&["src/main.rs", "README.md", "tests/it.rs"]);
        let selected = select(&files, &spec, &[], Path::new(".")).unwrap();
        assert_eq!(selected, paths(&["src/main.rs", "tests/it.rs"]));
    }

    #[test]
    fn test_exclude_prefixes() {
        let spec = SelectionSpec::new(&["**/*.js"]).with_excludes(&["node_modules/"]);
        let files = paths(&["app/index.js", "node_modules/pkg/index.js"]);
        let selected = select(&files, &spec, &[], Path::new(".")).unwrap();
        assert_eq!(selected, paths(&["app/index.js"]));
    }

    #[test]
    fn test_engine_wide_excludes_apply() {
        let spec = SelectionSpec::new(&["**/*.py"]);
        let files = paths(&["tool.py", "sub/.venv/lib/site.py"]);
        let selected = select(&files, &spec, &[".venv/".to_string()], Path::new(".")).unwrap();
        assert_eq!(selected, paths(&["tool.py"]));
    }

    #[test]
    fn test_empty_selection_is_normal() {
        let spec = SelectionSpec::new(&["**/*.xml"]);
        let selected = select(&paths(&["a.rs", "b.py"]), &spec, &[], Path::new(".")).unwrap();
        assert!(selected.is_empty());
    }

    #[test]
    fn test_order_preserved() {
        let spec = SelectionSpec::new(&["*.txt"]);
        let files = paths(&["z.txt", "a.txt", "m.txt"]);
        let selected = select(&files, &spec, &[], Path::new(".")).unwrap();
        assert_eq!(selected, files);
    }

    #[test]
    fn test_ansible_sniff_on_parsed_yaml() {
        let playbook = "- hosts: webservers\n  tasks:\n    - name: ping\n      ping:\n";
        assert!(sniff_matches(ContentSniff::AnsibleYaml, playbook));

        let plain = "name: pipeline\non: push\njobs: {}\n";
        assert!(!sniff_matches(ContentSniff::AnsibleYaml, plain));
    }

    #[test]
    fn test_ansible_sniff_raw_fallback_for_templated_yaml() {
        // Jinja braces make this invalid YAML until rendered
        let templated = "- hosts: {{ inventory_group }}\n  become: yes\n";
        assert!(sniff_matches(ContentSniff::AnsibleYaml, templated));
    }

    #[test]
    fn test_xml_sniff() {
        assert!(sniff_matches(ContentSniff::XmlDocument, "<?xml version=\"1.0\"?><a/>"));
        assert!(sniff_matches(ContentSniff::XmlDocument, "  <project></project>"));
        assert!(!sniff_matches(ContentSniff::XmlDocument, "key: value"));
    }

    #[test]
    fn test_sniff_filters_selection() {
        let dir = TempDir::new().unwrap();
        fs::write(
            dir.path().join("site.yml"),
            "- hosts: all\n  tasks: []\n",
        )
        .unwrap();
        fs::write(dir.path().join("ci.yml"), "stages:\n  - build\n").unwrap();

        let spec = SelectionSpec::new(&["**/*.yml"]).with_sniff(ContentSniff::AnsibleYaml);
        let files = paths(&["site.yml", "ci.yml"]);
        let selected = select(&files, &spec, &[], dir.path()).unwrap();
        assert_eq!(selected, paths(&["site.yml"]));
    }
}
