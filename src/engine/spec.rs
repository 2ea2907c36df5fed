//! Declarative hook specifications
//!
//! Every hook is described by a [`HookSpec`]: which files it cares about,
//! which tools it can run (in order of preference), and what default
//! configuration each tool needs. The engine consumes this table; no hook
//! carries its own control flow.

use serde::{Deserialize, Serialize};

/// How strong a check a tier provides, relative to the preferred tool.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Capability {
    /// The preferred tool with its full rule set
    Full,
    /// A weaker but still useful check (e.g. vet-only)
    Standard,
    /// Syntax validation only
    SyntaxOnly,
}

impl Capability {
    pub fn label(&self) -> &'static str {
        match self {
            Capability::Full => "full",
            Capability::Standard => "standard",
            Capability::SyntaxOnly => "syntax-only",
        }
    }
}

/// Package runners that can execute a tool without a global install
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Runner {
    /// pipx run <tool>
    Pipx,
    /// uvx <tool>
    Uvx,
    /// npx --no-install <tool>
    Npx,
}

impl Runner {
    /// The runner's own executable name
    pub fn command(&self) -> &'static str {
        match self {
            Runner::Pipx => "pipx",
            Runner::Uvx => "uvx",
            Runner::Npx => "npx",
        }
    }

    /// Arguments that precede the wrapped tool name
    pub fn dispatch_args(&self) -> &'static [&'static str] {
        match self {
            Runner::Pipx => &["run"],
            Runner::Uvx => &[],
            Runner::Npx => &["--no-install"],
        }
    }
}

/// How to find one tool in the environment
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolProbe {
    /// Executable name, also the cache key
    pub bin: String,
    /// Optional package runner tried before the PATH lookup
    pub runner: Option<Runner>,
    /// Arguments that make the tool print its version and exit 0
    pub version_args: Vec<String>,
    /// Human install hint shown when the tool is missing
    pub install_hint: String,
}

impl ToolProbe {
    pub fn new(bin: &str, runner: Option<Runner>, install_hint: &str) -> Self {
        Self {
            bin: bin.to_string(),
            runner,
            version_args: vec!["--version".to_string()],
            install_hint: install_hint.to_string(),
        }
    }

    pub fn with_version_args(mut self, args: &[&str]) -> Self {
        self.version_args = args.iter().map(|s| s.to_string()).collect();
        self
    }
}

/// Whether a tool is invoked once with the whole file list or once per
/// directory containing relevant files.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ScopeMode {
    FileList,
    PerDirectory,
}

/// One rung in a fallback chain
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolTier {
    pub tool: ToolProbe,
    pub capability: Capability,
    /// Invocation template; `{files}` expands to the target list,
    /// `{dir}` to the current scope directory.
    pub args: Vec<String>,
    pub scope: ScopeMode,
}

impl ToolTier {
    pub fn new(tool: ToolProbe, capability: Capability, args: &[&str]) -> Self {
        Self {
            tool,
            capability,
            args: args.iter().map(|s| s.to_string()).collect(),
            scope: ScopeMode::FileList,
        }
    }

    pub fn per_directory(mut self) -> Self {
        self.scope = ScopeMode::PerDirectory;
        self
    }
}

/// Default configuration a tool expects in the project root
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfigDescriptor {
    /// File names the tool recognizes as "already configured"
    pub candidates: Vec<String>,
    /// Name written when none of the candidates exist
    pub write_name: String,
    /// Template content, in the tool's native syntax (opaque to the engine)
    pub template: String,
}

impl ConfigDescriptor {
    pub fn new(candidates: &[&str], write_name: &str, template: &str) -> Self {
        Self {
            candidates: candidates.iter().map(|s| s.to_string()).collect(),
            write_name: write_name.to_string(),
            template: template.to_string(),
        }
    }
}

/// Content heuristics for files whose extension alone is ambiguous
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ContentSniff {
    /// YAML document that looks like an Ansible playbook/inventory/vars file
    AnsibleYaml,
    /// Leading `<?xml` declaration or a root element
    XmlDocument,
}

/// File-selection rules for one hook
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SelectionSpec {
    /// Include globs (any match qualifies)
    pub include: Vec<String>,
    /// Path-prefix exclusions applied after the include match
    pub exclude_prefixes: Vec<String>,
    /// Extra filter over file content when extensions are ambiguous
    pub sniff: Option<ContentSniff>,
}

impl SelectionSpec {
    pub fn new(include: &[&str]) -> Self {
        Self {
            include: include.iter().map(|s| s.to_string()).collect(),
            exclude_prefixes: Vec::new(),
            sniff: None,
        }
    }

    pub fn with_sniff(mut self, sniff: ContentSniff) -> Self {
        self.sniff = Some(sniff);
        self
    }

    pub fn with_excludes(mut self, prefixes: &[&str]) -> Self {
        self.exclude_prefixes = prefixes.iter().map(|s| s.to_string()).collect();
        self
    }
}

/// One sub-check inside a hook (a hook may chain several)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckSpec {
    /// Identifier used in diagnostics, e.g. "lint" or "sast"
    pub name: String,
    /// Ordered fallback chain, strongest tier first
    pub tiers: Vec<ToolTier>,
    /// Default config materialized before the tool runs
    pub config: Option<ConfigDescriptor>,
    /// Advisory checks never fail the hook on their own tool's absence
    pub advisory: bool,
}

impl CheckSpec {
    pub fn new(name: &str, tiers: Vec<ToolTier>) -> Self {
        Self {
            name: name.to_string(),
            tiers,
            config: None,
            advisory: false,
        }
    }

    pub fn with_config(mut self, config: ConfigDescriptor) -> Self {
        self.config = Some(config);
        self
    }

    pub fn advisory(mut self) -> Self {
        self.advisory = true;
        self
    }
}

/// A complete hook definition, static for the lifetime of a run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HookSpec {
    pub id: String,
    pub description: String,
    pub selection: SelectionSpec,
    /// `checks[0]` is the primary sub-check; the rest are companions
    pub checks: Vec<CheckSpec>,
    /// Optional hooks degrade to Skipped (with a warning) when no tool
    /// in any tier resolves, instead of failing the run
    pub optional: bool,
}

impl HookSpec {
    pub fn new(id: &str, description: &str, selection: SelectionSpec, checks: Vec<CheckSpec>) -> Self {
        Self {
            id: id.to_string(),
            description: description.to_string(),
            selection,
            checks,
            optional: false,
        }
    }

    pub fn optional(mut self) -> Self {
        self.optional = true;
        self
    }

    /// The primary sub-check (always present by construction)
    pub fn primary(&self) -> &CheckSpec {
        &self.checks[0]
    }
}
