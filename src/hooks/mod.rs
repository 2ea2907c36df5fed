//! Builtin hook table
//!
//! The declarative registry the engine consumes. Each entry wires one
//! quality gate to its tool chain, selection rules, and default config.
//! Rule content (which secrets to flag, which lint rules apply) lives in
//! the tools' own config files, not here.

use crate::engine::spec::{
    Capability, CheckSpec, ConfigDescriptor, ContentSniff, HookSpec, Runner, SelectionSpec,
    ToolProbe, ToolTier,
};

const ANSIBLE_LINT_TEMPLATE: &str = "\
# Default ansible-lint profile written by gatehouse.
# Tighten or replace as the playbooks mature.
profile: safety
offline: true
";

const GITLEAKS_TEMPLATE: &str = "\
# Default gitleaks config written by gatehouse.
# Extends the builtin ruleset; add project allowlists below.
[extend]
useDefault = true
";

/// All builtin hooks, in the order they run
pub fn builtin_hooks() -> Vec<HookSpec> {
    vec![
        secret_scan(),
        ansible_security(),
        dotnet_security(),
        xml_syntax(),
        license_header(),
    ]
}

/// Look up one builtin hook by id
pub fn find(id: &str) -> Option<HookSpec> {
    builtin_hooks().into_iter().find(|hook| hook.id == id)
}

/// Secret detection over everything staged. A missing scanner is always
/// fatal here; silently skipping a security gate defeats its purpose.
fn secret_scan() -> HookSpec {
    // gitleaks takes one --source path, not a file list. Scanning the
    // whole tree is deliberate: a leaked credential anywhere should block
    // the commit, not only one inside the staged files. Selection still
    // decides whether the hook runs at all.
    let gitleaks = ToolTier::new(
        ToolProbe::new("gitleaks", None, "brew install gitleaks or see github.com/gitleaks/gitleaks"),
        Capability::Full,
        &["detect", "--no-git", "--redact", "--source", "."],
    );
    let detect_secrets = ToolTier::new(
        ToolProbe::new("detect-secrets", Some(Runner::Pipx), "pipx install detect-secrets"),
        Capability::Standard,
        &["scan", "{files}"],
    );

    HookSpec::new(
        "secret-scan",
        "Detect hardcoded credentials and secrets",
        SelectionSpec::new(&["**/*"]),
        vec![
            CheckSpec::new("scan", vec![gitleaks, detect_secrets]).with_config(
                ConfigDescriptor::new(&[".gitleaks.toml", "gitleaks.toml"], ".gitleaks.toml", GITLEAKS_TEMPLATE),
            ),
        ],
    )
}

/// Ansible playbook and role security linting. YAML files qualify only
/// when their content looks like Ansible; a CI pipeline definition with
/// the same extension stays out.
fn ansible_security() -> HookSpec {
    let ansible_lint = ToolTier::new(
        ToolProbe::new("ansible-lint", Some(Runner::Pipx), "pipx install ansible-lint"),
        Capability::Full,
        &["--parseable", "{files}"],
    );
    let yamllint = ToolTier::new(
        ToolProbe::new("yamllint", Some(Runner::Pipx), "pipx install yamllint"),
        Capability::Standard,
        &["-f", "parsable", "{files}"],
    );
    // ansible-playbook validates one playbook tree at a time, so the
    // weakest tier iterates per directory instead of taking a flat list.
    let syntax_check = ToolTier::new(
        ToolProbe::new("ansible-playbook", None, "pipx install ansible-core"),
        Capability::SyntaxOnly,
        &["--syntax-check", "{files}"],
    )
    .per_directory();

    HookSpec::new(
        "ansible-security",
        "Security lint for Ansible playbooks, roles, and inventories",
        SelectionSpec::new(&["**/*.yml", "**/*.yaml"]).with_sniff(ContentSniff::AnsibleYaml),
        vec![
            CheckSpec::new("lint", vec![ansible_lint, yamllint, syntax_check]).with_config(
                ConfigDescriptor::new(
                    &[".ansible-lint", ".ansible-lint.yml", ".config/ansible-lint.yml"],
                    ".ansible-lint",
                    ANSIBLE_LINT_TEMPLATE,
                ),
            ),
        ],
    )
}

/// .NET SAST plus an advisory formatting audit. The SAST scanner runs per
/// project directory; the format audit is nice-to-have and never blocks a
/// commit on its own absence.
fn dotnet_security() -> HookSpec {
    let devskim = ToolTier::new(
        ToolProbe::new("devskim", None, "dotnet tool install --global Microsoft.CST.DevSkim.CLI"),
        Capability::Full,
        &["analyze", "--source-code", "{dir}"],
    )
    .per_directory();

    let format_audit = ToolTier::new(
        ToolProbe::new("dotnet", None, "install the .NET SDK from dotnet.microsoft.com"),
        Capability::Standard,
        &["format", "--verify-no-changes", "--include", "{files}"],
    );

    HookSpec::new(
        "dotnet-security",
        "Security scan for .NET sources and project files",
        SelectionSpec::new(&["**/*.cs", "**/*.cshtml", "**/*.csproj", "**/*.config"]),
        vec![
            CheckSpec::new("sast", vec![devskim]),
            CheckSpec::new("format-audit", vec![format_audit]).advisory(),
        ],
    )
}

/// XML well-formedness. Extensions alone lie (a `.config` file may be
/// key-value text), so candidates are sniffed for an XML document.
fn xml_syntax() -> HookSpec {
    let xmllint = ToolTier::new(
        ToolProbe::new("xmllint", None, "apt install libxml2-utils / brew install libxml2"),
        Capability::SyntaxOnly,
        &["--noout", "{files}"],
    );

    HookSpec::new(
        "xml-syntax",
        "Validate XML file syntax",
        SelectionSpec::new(&["**/*.xml", "**/*.csproj", "**/*.config", "**/*.xsd"])
            .with_sniff(ContentSniff::XmlDocument),
        vec![CheckSpec::new("validate", vec![xmllint])],
    )
}

/// License header / SPDX compliance. Advisory by design: a repo without
/// the tooling gets a warning, not a blocked commit.
fn license_header() -> HookSpec {
    let reuse = ToolTier::new(
        ToolProbe::new("reuse", Some(Runner::Pipx), "pipx install reuse"),
        Capability::Full,
        &["lint"],
    );

    HookSpec::new(
        "license-header",
        "Check license headers in source files",
        SelectionSpec::new(&[
            "**/*.rs", "**/*.py", "**/*.js", "**/*.ts", "**/*.go", "**/*.java", "**/*.c",
            "**/*.h", "**/*.cpp", "**/*.cs", "**/*.rb", "**/*.swift",
        ]),
        vec![CheckSpec::new("spdx", vec![reuse])],
    )
    .optional()
}
