//! Version and platform dependent MI command syntax
//!
//! gdb releases, vendor builds and the lldb-mi shim disagree on details such
//! as `--thread` qualifiers or `-var-list-children` arguments. All of those
//! differences live in [`RULES`]; the first matching row decides the syntax.

use crate::gdb::error::{MiError, Result};
use crate::gdb::types::{Platform, Record, Version};
use regex::Regex;
use std::collections::HashSet;
use std::str::FromStr;
use std::sync::OnceLock;
use tracing::{debug, warn};

/// Logical debugger operations and their arguments
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MiCommand<'a> {
    /// Directory change prefix; the caller appends the path
    EnvironmentCd,
    ExecStep { thread: &'a str },
    ExecNext { thread: &'a str },
    ExecStepInstruction { thread: &'a str },
    ExecNextInstruction { thread: &'a str },
    ExecFinish { thread: &'a str },
    VarListChildren { var: &'a str, from: u32, to: u32 },
    VarCreate { expr: &'a str, thread: &'a str, frame: &'a str },
    VarShowAttributes { var: &'a str },
    StackListFrames { thread: &'a str },
    StackListLocals,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CdForm {
    Mi,
    Console,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ChildrenForm {
    /// `"var" from to`
    QuotedRange,
    /// `"var"`
    Quoted,
    /// `var`
    Bare,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum VarCreateForm {
    Floating,
    ThreadFrame,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LocalsForm {
    Variables,
    Locals,
}

/// Command syntax of one backend family
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Syntax {
    cd: CdForm,
    /// `--thread` on stepping commands and `-stack-list-frames`
    thread_on_step: bool,
    thread_on_finish: bool,
    children: ChildrenForm,
    var_create: VarCreateForm,
    locals: LocalsForm,
    /// Thread and locals replies deviate from the documented MI shape
    unusual_output: bool,
}

const GDB_6: Syntax = Syntax {
    cd: CdForm::Mi,
    thread_on_step: false,
    thread_on_finish: false,
    children: ChildrenForm::QuotedRange,
    var_create: VarCreateForm::Floating,
    locals: LocalsForm::Locals,
    unusual_output: false,
};

const GDB_7_0: Syntax = Syntax {
    locals: LocalsForm::Variables,
    ..GDB_6
};

const GDB_7_1: Syntax = Syntax {
    thread_on_step: true,
    ..GDB_7_0
};

const APPLE_GDB: Syntax = Syntax {
    cd: CdForm::Console,
    children: ChildrenForm::Quoted,
    unusual_output: true,
    ..GDB_6
};

const LLDB_MI: Syntax = Syntax {
    cd: CdForm::Mi,
    thread_on_step: true,
    thread_on_finish: true,
    children: ChildrenForm::Bare,
    var_create: VarCreateForm::ThreadFrame,
    locals: LocalsForm::Locals,
    unusual_output: false,
};

/// Syntax used for configurations no rule covers
const BASELINE: Syntax = GDB_6;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Flavor {
    Gdb,
    Lldb,
}

#[derive(Debug, Clone, Copy)]
enum Platforms {
    Any,
    Only(&'static [Platform]),
}

impl Platforms {
    fn contains(self, platform: Platform) -> bool {
        match self {
            Platforms::Any => true,
            Platforms::Only(list) => list.contains(&platform),
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct Rule {
    flavor: Flavor,
    platforms: Platforms,
    /// Inclusive
    since: Version,
    /// Exclusive
    until: Option<Version>,
    syntax: Syntax,
}

impl Rule {
    fn matches(&self, version: Version, platform: Platform, lldb: bool) -> bool {
        let flavor = if lldb { Flavor::Lldb } else { Flavor::Gdb };
        self.flavor == flavor
            && self.platforms.contains(platform)
            && version >= self.since
            && self.until.map_or(true, |until| version < until)
    }
}

const SOLARIS: &[Platform] = &[Platform::SolarisSparc, Platform::SolarisX86];
const GENERIC: &[Platform] = &[
    Platform::LinuxX86,
    Platform::MacOsX86,
    Platform::Windows,
    Platform::Other,
];

const V6_3: Version = Version::new(6, 3);
const V6_4: Version = Version::new(6, 4);
const V6_6: Version = Version::new(6, 6);
const V6_8: Version = Version::new(6, 8);
const V7_0: Version = Version::new(7, 0);
const V7_1: Version = Version::new(7, 1);

/// Version/platform decision table, first match wins
static RULES: &[Rule] = &[
    // lldb-mi reports whatever version it likes; its syntax never changed
    Rule {
        flavor: Flavor::Lldb,
        platforms: Platforms::Any,
        since: Version::new(0, 0),
        until: None,
        syntax: LLDB_MI,
    },
    Rule {
        flavor: Flavor::Gdb,
        platforms: Platforms::Only(&[Platform::MacOsX86]),
        since: V6_3,
        until: Some(V6_4),
        syntax: APPLE_GDB,
    },
    Rule {
        flavor: Flavor::Gdb,
        platforms: Platforms::Only(SOLARIS),
        since: V6_6,
        until: Some(V7_0),
        syntax: GDB_6,
    },
    Rule {
        flavor: Flavor::Gdb,
        platforms: Platforms::Only(SOLARIS),
        since: V7_0,
        until: Some(V7_1),
        syntax: GDB_7_0,
    },
    Rule {
        flavor: Flavor::Gdb,
        platforms: Platforms::Only(SOLARIS),
        since: V7_1,
        until: None,
        syntax: GDB_7_1,
    },
    Rule {
        flavor: Flavor::Gdb,
        platforms: Platforms::Only(GENERIC),
        since: V6_8,
        until: Some(V7_0),
        syntax: GDB_6,
    },
    Rule {
        flavor: Flavor::Gdb,
        platforms: Platforms::Only(GENERIC),
        since: V7_0,
        until: Some(V7_1),
        syntax: GDB_7_0,
    },
    Rule {
        flavor: Flavor::Gdb,
        platforms: Platforms::Only(GENERIC),
        since: V7_1,
        until: None,
        syntax: GDB_7_1,
    },
];

/// Capability reported by `-list-features`
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Feature {
    FrozenVarobjs,
    PendingBreakpoints,
    ThreadInfo,
    DataReadMemoryBytes,
    BreakpointNotifications,
    AdaTaskInfo,
    Python,
    AsyncMode,
    ExecRunStartOption,
    Other(String),
}

impl From<&str> for Feature {
    fn from(s: &str) -> Self {
        match s {
            "frozen-varobjs" => Feature::FrozenVarobjs,
            "pending-breakpoints" => Feature::PendingBreakpoints,
            "thread-info" => Feature::ThreadInfo,
            "data-read-memory-bytes" => Feature::DataReadMemoryBytes,
            "breakpoint-notifications" => Feature::BreakpointNotifications,
            "ada-task-info" => Feature::AdaTaskInfo,
            "python" => Feature::Python,
            "async" => Feature::AsyncMode,
            "exec-run-start-option" => Feature::ExecRunStartOption,
            _ => Feature::Other(s.to_string()),
        }
    }
}

/// Command syntax bound to one debugger session's backend
#[derive(Debug, Clone)]
pub struct Peculiarity {
    version: Version,
    platform: Platform,
    lldb: bool,
    syntax: Syntax,
    supported: bool,
    features: HashSet<Feature>,
}

impl Peculiarity {
    pub fn new(version: Version, platform: Platform, lldb: bool) -> Self {
        let rule = RULES
            .iter()
            .find(|rule| rule.matches(version, platform, lldb));
        if rule.is_none() {
            warn!(
                "Unsupported debugger: {} {} on {}",
                if lldb { "lldb-mi" } else { "gdb" },
                version,
                platform
            );
        }
        Self {
            version,
            platform,
            lldb,
            syntax: rule.map_or(BASELINE, |rule| rule.syntax),
            supported: rule.is_some(),
            features: HashSet::new(),
        }
    }

    /// Resolver for a `--version` banner, falling back to gdb 6.8 when the
    /// banner cannot be parsed
    pub fn from_banner(banner: &str, platform: Platform, lldb: bool) -> Self {
        let version = Version::parse_banner(banner).unwrap_or_else(|err| {
            warn!("{}, assuming gdb {}", err, Version::FALLBACK);
            Version::FALLBACK
        });
        Self::new(version, platform, lldb)
    }

    pub fn version(&self) -> Version {
        self.version
    }

    pub fn platform(&self) -> Platform {
        self.platform
    }

    pub fn is_lldb(&self) -> bool {
        self.lldb
    }

    pub fn is_supported(&self) -> bool {
        self.supported
    }

    /// Command text for `command`; unsupported configurations get the
    /// baseline gdb syntax
    pub fn command(&self, command: &MiCommand<'_>) -> String {
        let syntax = &self.syntax;
        match *command {
            MiCommand::EnvironmentCd => match syntax.cd {
                CdForm::Mi => "-environment-cd".to_string(),
                CdForm::Console => "cd".to_string(),
            },
            MiCommand::ExecStep { thread } => {
                with_thread("-exec-step", thread, syntax.thread_on_step)
            }
            MiCommand::ExecNext { thread } => {
                with_thread("-exec-next", thread, syntax.thread_on_step)
            }
            MiCommand::ExecStepInstruction { thread } => {
                with_thread("-exec-step-instruction", thread, syntax.thread_on_step)
            }
            MiCommand::ExecNextInstruction { thread } => {
                with_thread("-exec-next-instruction", thread, syntax.thread_on_step)
            }
            MiCommand::ExecFinish { thread } => {
                with_thread("-exec-finish", thread, syntax.thread_on_finish)
            }
            MiCommand::VarListChildren { var, from, to } => match syntax.children {
                ChildrenForm::QuotedRange => {
                    format!("-var-list-children --all-values \"{}\" {} {}", var, from, to)
                }
                ChildrenForm::Quoted => format!("-var-list-children --all-values \"{}\"", var),
                ChildrenForm::Bare => format!("-var-list-children --all-values {}", var),
            },
            MiCommand::VarCreate { expr, thread, frame } => match syntax.var_create {
                VarCreateForm::Floating => format!("-var-create - @ {}", expr),
                VarCreateForm::ThreadFrame => format!(
                    "-var-create - @ {} --thread {} --frame {}",
                    expr, thread, frame
                ),
            },
            MiCommand::VarShowAttributes { var } => format!("-var-show-attributes {}", var),
            MiCommand::StackListFrames { thread } => {
                with_thread("-stack-list-frames", thread, syntax.thread_on_step)
            }
            MiCommand::StackListLocals => match syntax.locals {
                LocalsForm::Variables => "-stack-list-variables --no-values".to_string(),
                LocalsForm::Locals => "-stack-list-locals --no-values".to_string(),
            },
        }
    }

    /// Like [`Peculiarity::command`] but refuses unsupported configurations
    pub fn try_command(&self, command: &MiCommand<'_>) -> Result<String> {
        if !self.supported {
            return Err(MiError::Unsupported {
                version: self.version,
                platform: self.platform,
                lldb: self.lldb,
            });
        }
        Ok(self.command(command))
    }

    pub fn environment_cd(&self) -> String {
        self.command(&MiCommand::EnvironmentCd)
    }

    pub fn exec_step(&self, thread: &str) -> String {
        self.command(&MiCommand::ExecStep { thread })
    }

    pub fn exec_next(&self, thread: &str) -> String {
        self.command(&MiCommand::ExecNext { thread })
    }

    pub fn exec_step_instruction(&self, thread: &str) -> String {
        self.command(&MiCommand::ExecStepInstruction { thread })
    }

    pub fn exec_next_instruction(&self, thread: &str) -> String {
        self.command(&MiCommand::ExecNextInstruction { thread })
    }

    pub fn exec_finish(&self, thread: &str) -> String {
        self.command(&MiCommand::ExecFinish { thread })
    }

    pub fn list_children(&self, var: &str, from: u32, to: u32) -> String {
        self.command(&MiCommand::VarListChildren { var, from, to })
    }

    pub fn create_var(&self, expr: &str, thread: &str, frame: &str) -> String {
        self.command(&MiCommand::VarCreate {
            expr,
            thread,
            frame,
        })
    }

    pub fn show_attributes(&self, var: &str) -> String {
        self.command(&MiCommand::VarShowAttributes { var })
    }

    pub fn stack_list_frames(&self, thread: &str) -> String {
        self.command(&MiCommand::StackListFrames { thread })
    }

    pub fn stack_list_locals(&self) -> String {
        self.command(&MiCommand::StackListLocals)
    }

    /// `info threads` replies need the console fallback parser
    pub fn threads_output_unusual(&self) -> bool {
        self.syntax.unusual_output
    }

    /// Locals come back wrapped in an extra tuple
    pub fn locals_output_unusual(&self) -> bool {
        self.syntax.unusual_output
    }

    /// Copy of this resolver carrying the features of a `-list-features` reply
    pub fn with_features(mut self, record: &Record) -> Self {
        if let Some(list) = record.values().list_of("features") {
            self.features = list
                .iter()
                .filter_map(|item| item.value().as_str())
                .map(Feature::from)
                .collect();
            debug!("Backend features: {:?}", self.features);
        }
        self
    }

    pub fn supports(&self, feature: &Feature) -> bool {
        self.features.contains(feature)
    }

    /// Whether `-thread-info` can be used instead of console `info threads`
    pub fn thread_info_available(&self) -> bool {
        self.lldb || self.supports(&Feature::ThreadInfo)
    }
}

fn with_thread(base: &str, thread: &str, qualify: bool) -> String {
    if qualify {
        format!("{} --thread {}", base, thread)
    } else {
        base.to_string()
    }
}

/// Resolve one command without keeping a resolver around
pub fn resolve(command: &MiCommand<'_>, version: Version, platform: Platform, lldb: bool) -> String {
    Peculiarity::new(version, platform, lldb).command(command)
}

fn version_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"(?:^|[\s(])(\d+)\.(\d+)").expect("valid version pattern"))
}

impl Version {
    /// Extract `(major, minor)` from a `--version` banner.
    ///
    /// The first line carrying a version wins; within it the last
    /// `<digits>.<digits>` that starts a word, so `GNU gdb (Ubuntu 12.1-0ubuntu1~22.04) 12.1`
    /// yields 12.1 and `GNU gdb 6.3.50-20050815 (Apple version gdb-1708)` yields 6.3.
    pub fn parse_banner(banner: &str) -> Result<Version> {
        banner
            .lines()
            .find_map(|line| {
                let caps = version_pattern().captures_iter(line).last()?;
                let major = caps.get(1)?.as_str().parse().ok()?;
                let minor = caps.get(2)?.as_str().parse().ok()?;
                Some(Version::new(major, minor))
            })
            .ok_or_else(|| MiError::UnrecognizedVersion(banner.to_string()))
    }
}

impl FromStr for Version {
    type Err = MiError;

    fn from_str(s: &str) -> Result<Self> {
        Version::parse_banner(s)
    }
}

impl FromStr for Platform {
    type Err = MiError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "linux-x86" | "linux" => Ok(Platform::LinuxX86),
            "solaris-sparc" => Ok(Platform::SolarisSparc),
            "solaris-x86" | "solaris" => Ok(Platform::SolarisX86),
            "macos-x86" | "macos" | "mac" | "darwin" => Ok(Platform::MacOsX86),
            "windows" | "win" => Ok(Platform::Windows),
            "other" => Ok(Platform::Other),
            other => Err(MiError::UnknownPlatform(other.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gdb::parser::MiParser;
    use pretty_assertions::assert_eq;

    fn gdb(major: u32, minor: u32, platform: Platform) -> Peculiarity {
        Peculiarity::new(Version::new(major, minor), platform, false)
    }

    #[test]
    fn test_solaris_7_0_has_no_thread_qualifier() {
        let p = gdb(7, 0, Platform::SolarisX86);
        assert!(p.is_supported());
        assert_eq!(p.exec_step("0"), "-exec-step");
        assert_eq!(p.stack_list_frames("0"), "-stack-list-frames");
    }

    #[test]
    fn test_solaris_7_7_has_thread_qualifier() {
        let p = gdb(7, 7, Platform::SolarisX86);
        assert_eq!(p.exec_step("0"), "-exec-step --thread 0");
        assert_eq!(p.exec_next("3"), "-exec-next --thread 3");
        assert_eq!(p.exec_step_instruction("1"), "-exec-step-instruction --thread 1");
        assert_eq!(p.exec_next_instruction("1"), "-exec-next-instruction --thread 1");
        assert_eq!(p.exec_finish("0"), "-exec-finish");
        assert_eq!(p.stack_list_frames("2"), "-stack-list-frames --thread 2");
    }

    #[test]
    fn test_apple_gdb() {
        let p = gdb(6, 3, Platform::MacOsX86);
        assert!(p.is_supported());
        assert_eq!(p.environment_cd(), "cd");
        assert_eq!(p.exec_finish("0"), "-exec-finish");
        assert_eq!(p.exec_step("0"), "-exec-step");
        assert_eq!(
            p.list_children("var0", 1, 100),
            "-var-list-children --all-values \"var0\""
        );
        assert_eq!(p.stack_list_locals(), "-stack-list-locals --no-values");
        assert!(p.threads_output_unusual());
        assert!(p.locals_output_unusual());
    }

    #[test]
    fn test_lldb_mi() {
        let p = Peculiarity::new(Version::new(6, 8), Platform::MacOsX86, true);
        assert!(p.is_supported());
        assert!(p.is_lldb());
        assert_eq!(p.exec_finish("0"), "-exec-finish --thread 0");
        assert_eq!(p.exec_step("0"), "-exec-step --thread 0");
        assert_eq!(p.list_children("var0", 1, 100), "-var-list-children --all-values var0");
        assert_eq!(
            p.create_var("argc", "1", "0"),
            "-var-create - @ argc --thread 1 --frame 0"
        );
        assert_eq!(p.environment_cd(), "-environment-cd");
        assert!(!p.threads_output_unusual());
        assert!(p.thread_info_available());
    }

    #[test]
    fn test_lldb_ignores_version_and_platform() {
        for platform in Platform::ALL {
            let p = Peculiarity::new(Version::new(1, 0), platform, true);
            assert!(p.is_supported());
            assert_eq!(p.exec_next("5"), "-exec-next --thread 5");
        }
    }

    #[test]
    fn test_unsupported_configurations() {
        assert!(!gdb(6, 3, Platform::SolarisX86).is_supported());
        assert!(!gdb(6, 3, Platform::SolarisSparc).is_supported());
        assert!(!gdb(6, 3, Platform::LinuxX86).is_supported());
        assert!(!gdb(6, 5, Platform::MacOsX86).is_supported());
    }

    #[test]
    fn test_unsupported_still_resolves() {
        let p = gdb(6, 3, Platform::SolarisX86);
        assert_eq!(p.exec_step("0"), "-exec-step");
        assert!(matches!(
            p.try_command(&MiCommand::ExecStep { thread: "0" }),
            Err(MiError::Unsupported { .. })
        ));
        assert_eq!(p.version(), Version::new(6, 3));
        assert_eq!(p.platform(), Platform::SolarisX86);
    }

    #[test]
    fn test_generic_gdb_rows() {
        let p = gdb(6, 8, Platform::LinuxX86);
        assert_eq!(p.exec_step("1"), "-exec-step");
        assert_eq!(p.stack_list_locals(), "-stack-list-locals --no-values");
        assert_eq!(
            p.list_children("var1", 0, 25),
            "-var-list-children --all-values \"var1\" 0 25"
        );

        let p = gdb(7, 0, Platform::Windows);
        assert_eq!(p.exec_step("1"), "-exec-step");
        assert_eq!(p.stack_list_locals(), "-stack-list-variables --no-values");

        let p = gdb(12, 1, Platform::LinuxX86);
        assert_eq!(p.exec_step("1"), "-exec-step --thread 1");
        assert_eq!(p.exec_finish("1"), "-exec-finish");
        assert_eq!(p.create_var("x + 1", "1", "0"), "-var-create - @ x + 1");
        assert_eq!(p.show_attributes("var3"), "-var-show-attributes var3");
        assert_eq!(p.environment_cd(), "-environment-cd");
    }

    #[test]
    fn test_thread_qualifier_is_monotonic() {
        for platform in Platform::ALL {
            let mut required = false;
            for major in 6..=14 {
                for minor in 0..=9 {
                    let p = gdb(major, minor, platform);
                    if !p.is_supported() {
                        continue;
                    }
                    let qualified = p.exec_step("0").contains("--thread");
                    assert!(qualified || !required, "{} {}.{}", platform, major, minor);
                    required |= qualified;
                }
            }
        }
    }

    #[test]
    fn test_resolve_free_function() {
        let cmd = MiCommand::VarListChildren {
            var: "var2",
            from: 0,
            to: 10,
        };
        assert_eq!(
            resolve(&cmd, Version::new(7, 6), Platform::LinuxX86, false),
            "-var-list-children --all-values \"var2\" 0 10"
        );
    }

    #[test]
    fn test_parse_banner() {
        let cases = [
            ("GNU gdb (GDB) 7.7.1\nCopyright (C) 2014 Free Software Foundation, Inc.", Version::new(7, 7)),
            ("GNU gdb 6.3.50-20050815 (Apple version gdb-1708) (Thu Nov  3 21:59:02 UTC 2011)", Version::new(6, 3)),
            ("GNU gdb (Ubuntu 12.1-0ubuntu1~22.04) 12.1", Version::new(12, 1)),
            ("GNU gdb Red Hat Linux (6.3.0.0-1.132.EL4rh)", Version::new(6, 3)),
            ("GNU gdb (GDB) Fedora 7.7.1-21.fc20", Version::new(7, 7)),
            ("7.1", Version::new(7, 1)),
        ];
        for (banner, expected) in cases {
            assert_eq!(Version::parse_banner(banner).unwrap(), expected, "{}", banner);
        }
        assert!(matches!(
            Version::parse_banner("no version here"),
            Err(MiError::UnrecognizedVersion(_))
        ));
    }

    #[test]
    fn test_from_banner_falls_back() {
        let p = Peculiarity::from_banner("garbage", Platform::LinuxX86, false);
        assert_eq!(p.version(), Version::FALLBACK);
        assert!(p.is_supported());
    }

    #[test]
    fn test_platform_from_str() {
        for platform in Platform::ALL {
            assert_eq!(platform.name().parse::<Platform>().unwrap(), platform);
        }
        assert_eq!("Darwin".parse::<Platform>().unwrap(), Platform::MacOsX86);
        assert!("beos".parse::<Platform>().is_err());
    }

    #[test]
    fn test_features() {
        let record = MiParser::new().parse_line(
            r#"^done,features=["frozen-varobjs","pending-breakpoints","thread-info","undefined-command-error-code"]"#,
        );
        let p = gdb(7, 7, Platform::LinuxX86);
        assert!(!p.thread_info_available());

        let p = p.with_features(&record);
        assert!(p.supports(&Feature::ThreadInfo));
        assert!(p.supports(&Feature::Other("undefined-command-error-code".to_string())));
        assert!(!p.supports(&Feature::Python));
        assert!(p.thread_info_available());
        assert_eq!(p.version(), Version::new(7, 7));
    }

    #[test]
    fn test_async_feature() {
        assert_eq!(Feature::from("async"), Feature::AsyncMode);

        let record = MiParser::new().parse_line(r#"^done,features=["async","python"]"#);
        let p = gdb(7, 7, Platform::LinuxX86).with_features(&record);
        assert!(p.supports(&Feature::AsyncMode));
        assert!(p.supports(&Feature::Python));
        assert!(!p.supports(&Feature::Other("async".to_string())));
    }
}
