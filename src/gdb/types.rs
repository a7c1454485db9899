//! GDB Machine Interface (MI) Type Definitions

use serde::{Deserialize, Serialize, Serializer};
use std::fmt;

/// Kind of a single MI output line
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum RecordKind {
    Result,
    ExecAsync,
    StatusAsync,
    NotifyAsync,
    ConsoleStream,
    TargetStream,
    LogStream,
    Prompt,
    Malformed,
}

impl RecordKind {
    /// Classify the character that introduces a result, async or stream record
    pub fn from_marker(c: char) -> Option<Self> {
        match c {
            '^' => Some(RecordKind::Result),
            '*' => Some(RecordKind::ExecAsync),
            '+' => Some(RecordKind::StatusAsync),
            '=' => Some(RecordKind::NotifyAsync),
            '~' => Some(RecordKind::ConsoleStream),
            '@' => Some(RecordKind::TargetStream),
            '&' => Some(RecordKind::LogStream),
            _ => None,
        }
    }

    pub fn marker(self) -> Option<char> {
        match self {
            RecordKind::Result => Some('^'),
            RecordKind::ExecAsync => Some('*'),
            RecordKind::StatusAsync => Some('+'),
            RecordKind::NotifyAsync => Some('='),
            RecordKind::ConsoleStream => Some('~'),
            RecordKind::TargetStream => Some('@'),
            RecordKind::LogStream => Some('&'),
            RecordKind::Prompt | RecordKind::Malformed => None,
        }
    }

    pub fn is_stream(self) -> bool {
        matches!(
            self,
            RecordKind::ConsoleStream | RecordKind::TargetStream | RecordKind::LogStream
        )
    }
}

/// Scalar MI value.
///
/// Keeps the body exactly as it appeared between the quotes (`raw`) next to
/// the decoded text, so records render back to their original wire form.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MiConst {
    raw: String,
    text: String,
    quoted: bool,
}

impl MiConst {
    /// Const read from a quoted string: `raw` is the body with escapes intact
    pub fn quoted(raw: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            raw: raw.into(),
            text: text.into(),
            quoted: true,
        }
    }

    /// Unquoted word, as emitted by some lldb-mi and console replies
    pub fn bare(text: impl Into<String>) -> Self {
        let text = text.into();
        Self {
            raw: text.clone(),
            text,
            quoted: false,
        }
    }

    /// Quoted const built from already decoded text
    pub fn from_text(text: impl Into<String>) -> Self {
        let text = text.into();
        Self {
            raw: escape(&text),
            text,
            quoted: true,
        }
    }

    /// Decoded text
    pub fn value(&self) -> &str {
        &self.text
    }

    /// Body with its original escapes, without the surrounding quotes
    pub fn raw(&self) -> &str {
        &self.raw
    }
}

impl fmt::Display for MiConst {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.quoted {
            write!(f, "\"{}\"", self.raw)
        } else {
            f.write_str(&self.raw)
        }
    }
}

impl Serialize for MiConst {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.text)
    }
}

/// Escape text for use inside an MI quoted string
pub fn escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\t' => out.push_str("\\t"),
            '\r' => out.push_str("\\r"),
            _ => out.push(c),
        }
    }
    out
}

/// GDB/MI value types
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum MiValue {
    Const(MiConst),
    Tuple(MiList),
    List(MiList),
}

impl MiValue {
    pub fn as_const(&self) -> Option<&MiConst> {
        match self {
            MiValue::Const(c) => Some(c),
            _ => None,
        }
    }

    /// Decoded text of a const value
    pub fn as_str(&self) -> Option<&str> {
        self.as_const().map(MiConst::value)
    }

    pub fn as_tuple(&self) -> Option<&MiList> {
        match self {
            MiValue::Tuple(t) => Some(t),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&MiList> {
        match self {
            MiValue::List(l) => Some(l),
            _ => None,
        }
    }
}

impl fmt::Display for MiValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MiValue::Const(c) => write!(f, "{}", c),
            MiValue::Tuple(t) => write!(f, "{{{}}}", t),
            MiValue::List(l) => write!(f, "[{}]", l),
        }
    }
}

/// One entry of an MI list: `key=value` or a positional value
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MiItem {
    #[serde(skip_serializing_if = "Option::is_none")]
    key: Option<String>,
    value: MiValue,
}

impl MiItem {
    pub fn named(key: impl Into<String>, value: MiValue) -> Self {
        Self {
            key: Some(key.into()),
            value,
        }
    }

    pub fn positional(value: MiValue) -> Self {
        Self { key: None, value }
    }

    pub fn key(&self) -> Option<&str> {
        self.key.as_deref()
    }

    pub fn value(&self) -> &MiValue {
        &self.value
    }

    pub fn matches(&self, key: &str) -> bool {
        self.key.as_deref() == Some(key)
    }
}

impl fmt::Display for MiItem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.key {
            Some(key) => write!(f, "{}={}", key, self.value),
            None => write!(f, "{}", self.value),
        }
    }
}

/// Ordered MI entries. Duplicate keys are kept in source order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct MiList {
    items: Vec<MiItem>,
}

impl MiList {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, item: MiItem) {
        self.items.push(item);
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&MiItem> {
        self.items.get(index)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, MiItem> {
        self.items.iter()
    }

    /// First value stored under `key`
    pub fn value_of(&self, key: &str) -> Option<&MiValue> {
        self.items.iter().find(|i| i.matches(key)).map(MiItem::value)
    }

    /// Every value stored under `key`, in order
    pub fn values_of<'a>(&'a self, key: &'a str) -> impl Iterator<Item = &'a MiValue> + 'a {
        self.items
            .iter()
            .filter(move |i| i.matches(key))
            .map(MiItem::value)
    }

    /// Decoded text under `key`; `None` if absent or not a scalar
    pub fn const_value(&self, key: &str) -> Option<&str> {
        self.value_of(key).and_then(MiValue::as_str)
    }

    pub fn tuple_of(&self, key: &str) -> Option<&MiList> {
        self.value_of(key).and_then(MiValue::as_tuple)
    }

    pub fn list_of(&self, key: &str) -> Option<&MiList> {
        self.value_of(key).and_then(MiValue::as_list)
    }
}

impl fmt::Display for MiList {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, item) in self.items.iter().enumerate() {
            if i > 0 {
                f.write_str(",")?;
            }
            write!(f, "{}", item)?;
        }
        Ok(())
    }
}

impl FromIterator<MiItem> for MiList {
    fn from_iter<I: IntoIterator<Item = MiItem>>(iter: I) -> Self {
        Self {
            items: iter.into_iter().collect(),
        }
    }
}

impl<'a> IntoIterator for &'a MiList {
    type Item = &'a MiItem;
    type IntoIter = std::slice::Iter<'a, MiItem>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.iter()
    }
}

/// One parsed MI output line
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Record {
    kind: RecordKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    token: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    class: Option<String>,
    values: MiList,
    /// Prompt text a `Prompt` record matched
    #[serde(skip_serializing_if = "Option::is_none")]
    prompt: Option<String>,
}

impl Record {
    /// Result or async record
    pub fn new(kind: RecordKind, token: Option<u64>, class: impl Into<String>, values: MiList) -> Self {
        Self {
            kind,
            token,
            class: Some(class.into()),
            values,
            prompt: None,
        }
    }

    /// Stream record carrying its payload as the single positional const
    pub fn stream(kind: RecordKind, payload: MiConst) -> Self {
        Self {
            kind,
            token: None,
            class: None,
            values: std::iter::once(MiItem::positional(MiValue::Const(payload))).collect(),
            prompt: None,
        }
    }

    pub fn prompt(text: impl Into<String>) -> Self {
        Self {
            kind: RecordKind::Prompt,
            token: None,
            class: None,
            values: MiList::new(),
            prompt: Some(text.into()),
        }
    }

    /// Unrecognized line, kept verbatim
    pub fn malformed(line: &str) -> Self {
        Self {
            kind: RecordKind::Malformed,
            token: None,
            class: None,
            values: std::iter::once(MiItem::positional(MiValue::Const(MiConst::bare(line))))
                .collect(),
            prompt: None,
        }
    }

    pub fn kind(&self) -> RecordKind {
        self.kind
    }

    pub fn token(&self) -> Option<u64> {
        self.token
    }

    /// Result or async class (`done`, `stopped`, ...)
    pub fn class(&self) -> Option<&str> {
        self.class.as_deref()
    }

    pub fn values(&self) -> &MiList {
        &self.values
    }

    pub fn is_result(&self) -> bool {
        self.kind == RecordKind::Result
    }

    pub fn is_stream(&self) -> bool {
        self.kind.is_stream()
    }

    pub fn is_class(&self, class: &str) -> bool {
        self.class.as_deref() == Some(class)
    }

    pub fn is_error(&self) -> bool {
        self.is_result() && self.is_class("error")
    }

    /// No results attached
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// `msg` of an `^error` record
    pub fn error(&self) -> Option<&str> {
        if self.is_error() {
            self.values.const_value("msg")
        } else {
            None
        }
    }

    /// Decoded payload of a stream record, or the verbatim text of a malformed line
    pub fn text(&self) -> Option<&str> {
        match self.kind {
            RecordKind::ConsoleStream
            | RecordKind::TargetStream
            | RecordKind::LogStream
            | RecordKind::Malformed => self.values.get(0).and_then(|i| i.value().as_str()),
            RecordKind::Result
            | RecordKind::ExecAsync
            | RecordKind::StatusAsync
            | RecordKind::NotifyAsync
            | RecordKind::Prompt => None,
        }
    }
}

impl fmt::Display for Record {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.kind {
            RecordKind::Prompt => f.write_str(self.prompt.as_deref().unwrap_or("(gdb)")),
            RecordKind::Malformed => write!(f, "{}", self.values),
            RecordKind::ConsoleStream | RecordKind::TargetStream | RecordKind::LogStream => {
                if let Some(marker) = self.kind.marker() {
                    write!(f, "{}", marker)?;
                }
                write!(f, "{}", self.values)
            }
            RecordKind::Result
            | RecordKind::ExecAsync
            | RecordKind::StatusAsync
            | RecordKind::NotifyAsync => {
                if let Some(token) = self.token {
                    write!(f, "{}", token)?;
                }
                if let Some(marker) = self.kind.marker() {
                    write!(f, "{}", marker)?;
                }
                f.write_str(self.class.as_deref().unwrap_or_default())?;
                if !self.values.is_empty() {
                    write!(f, ",{}", self.values)?;
                }
                Ok(())
            }
        }
    }
}

/// Backend version as `(major, minor)`
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Version {
    pub major: u32,
    pub minor: u32,
}

impl Version {
    /// Assumed when the backend banner cannot be parsed
    pub const FALLBACK: Version = Version::new(6, 8);

    pub const fn new(major: u32, minor: u32) -> Self {
        Self { major, minor }
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.major, self.minor)
    }
}

/// Host platform of the debugger backend
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Platform {
    LinuxX86,
    SolarisSparc,
    SolarisX86,
    MacOsX86,
    Windows,
    Other,
}

impl Platform {
    pub const ALL: [Platform; 6] = [
        Platform::LinuxX86,
        Platform::SolarisSparc,
        Platform::SolarisX86,
        Platform::MacOsX86,
        Platform::Windows,
        Platform::Other,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Platform::LinuxX86 => "linux-x86",
            Platform::SolarisSparc => "solaris-sparc",
            Platform::SolarisX86 => "solaris-x86",
            Platform::MacOsX86 => "macos-x86",
            Platform::Windows => "windows",
            Platform::Other => "other",
        }
    }

    /// Platform this binary was built for
    pub fn current() -> Self {
        if cfg!(any(target_os = "solaris", target_os = "illumos")) {
            if cfg!(target_arch = "sparc64") {
                Platform::SolarisSparc
            } else {
                Platform::SolarisX86
            }
        } else if cfg!(target_os = "linux") {
            Platform::LinuxX86
        } else if cfg!(target_os = "macos") {
            Platform::MacOsX86
        } else if cfg!(target_os = "windows") {
            Platform::Windows
        } else {
            Platform::Other
        }
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Stop reason types
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum StopReason {
    BreakpointHit,
    WatchpointTrigger,
    ReadWatchpointTrigger,
    AccessWatchpointTrigger,
    FunctionFinished,
    LocationReached,
    WatchpointScope,
    EndSteppingRange,
    ExitedSignalled,
    Exited,
    ExitedNormally,
    SignalReceived,
    SolibEvent,
    Fork,
    Vfork,
    SyscallEntry,
    SyscallReturn,
    Unknown(String),
}

impl From<&str> for StopReason {
    fn from(s: &str) -> Self {
        match s {
            "breakpoint-hit" => StopReason::BreakpointHit,
            "watchpoint-trigger" => StopReason::WatchpointTrigger,
            "read-watchpoint-trigger" => StopReason::ReadWatchpointTrigger,
            "access-watchpoint-trigger" => StopReason::AccessWatchpointTrigger,
            "function-finished" => StopReason::FunctionFinished,
            "location-reached" => StopReason::LocationReached,
            "watchpoint-scope" => StopReason::WatchpointScope,
            "end-stepping-range" => StopReason::EndSteppingRange,
            "exited-signalled" => StopReason::ExitedSignalled,
            "exited" => StopReason::Exited,
            "exited-normally" => StopReason::ExitedNormally,
            "signal-received" => StopReason::SignalReceived,
            "solib-event" => StopReason::SolibEvent,
            "fork" => StopReason::Fork,
            "vfork" => StopReason::Vfork,
            "syscall-entry" => StopReason::SyscallEntry,
            "syscall-return" => StopReason::SyscallReturn,
            _ => StopReason::Unknown(s.to_string()),
        }
    }
}

/// Breakpoint information
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Breakpoint {
    pub number: String,
    #[serde(rename = "type")]
    pub breakpoint_type: String,
    pub disposition: String,
    pub enabled: bool,
    #[serde(default)]
    pub addr: Option<String>,
    #[serde(default)]
    pub func: Option<String>,
    #[serde(default)]
    pub file: Option<String>,
    #[serde(default)]
    pub fullname: Option<String>,
    #[serde(default)]
    pub line: Option<u64>,
    #[serde(default)]
    pub thread_groups: Option<Vec<String>>,
    #[serde(default)]
    pub times: u64,
    #[serde(default)]
    pub original_location: Option<String>,
    #[serde(default)]
    pub condition: Option<String>,
    #[serde(default)]
    pub ignore_count: Option<u64>,
    /// Resolved locations of a multi-location breakpoint (`addr="<MULTIPLE>"`)
    #[serde(default)]
    pub locations: Vec<BreakpointLocation>,
}

/// One location of a multi-location breakpoint, e.g. number `1.2`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BreakpointLocation {
    pub number: String,
    pub enabled: bool,
    #[serde(default)]
    pub addr: Option<String>,
    #[serde(default)]
    pub func: Option<String>,
    #[serde(default)]
    pub file: Option<String>,
    #[serde(default)]
    pub fullname: Option<String>,
    #[serde(default)]
    pub line: Option<u64>,
}

/// Frame information
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Frame {
    pub level: u64,
    pub addr: String,
    #[serde(default)]
    pub func: Option<String>,
    #[serde(default)]
    pub file: Option<String>,
    #[serde(default)]
    pub fullname: Option<String>,
    #[serde(default)]
    pub line: Option<u64>,
    #[serde(default)]
    pub arch: Option<String>,
}

/// Variable object information
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Variable {
    /// MI name of the variable object, e.g. `var1.public.x`
    pub name: String,
    #[serde(default)]
    pub exp: Option<String>,
    #[serde(default)]
    pub value: Option<String>,
    #[serde(default)]
    pub var_type: Option<String>,
    #[serde(default)]
    pub numchild: Option<u32>,
    #[serde(default)]
    pub has_more: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputChannel {
    Console,
    Target,
    Log,
}

/// GDB event types
#[derive(Debug, Clone, PartialEq)]
pub enum GdbEvent {
    Stopped {
        reason: StopReason,
        frame: Option<Frame>,
        thread_id: Option<String>,
    },
    Running {
        thread_id: Option<String>,
    },
    BreakpointCreated {
        breakpoint: Breakpoint,
    },
    BreakpointModified {
        breakpoint: Breakpoint,
    },
    BreakpointDeleted {
        number: String,
    },
    ThreadCreated {
        id: String,
        group_id: String,
    },
    ThreadExited {
        id: String,
        group_id: String,
    },
    ThreadSelected {
        id: String,
    },
    Error {
        message: String,
    },
    Output {
        channel: OutputChannel,
        content: String,
    },
}

/// MI parser configuration
#[derive(Debug, Clone)]
pub struct ParserConfig {
    /// Charset label used for octal-escaped byte runs
    pub encoding: String,
    /// Lines recognized as the backend prompt
    pub prompts: Vec<String>,
}

impl Default for ParserConfig {
    fn default() -> Self {
        Self {
            encoding: "utf-8".to_string(),
            prompts: vec!["(gdb)".to_string()],
        }
    }
}
