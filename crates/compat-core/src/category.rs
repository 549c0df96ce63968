//! Test category classifier.
//!
//! A test identifier such as `parallel/test-http2-connect.js` maps to exactly
//! one [`Category`]. Directory rules come first, then the basename is matched
//! against a fixed prefix table, longest prefix first. Anything unmatched is
//! [`Category::Others`].

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};

/// Functional category of a test.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Category {
    Assert,
    Buffer,
    ChildProcess,
    Cluster,
    Console,
    Crypto,
    Dgram,
    Dns,
    Events,
    Fs,
    Http,
    Http2,
    Https,
    Inspector,
    Module,
    Net,
    Os,
    Others,
    Path,
    Process,
    Promise,
    Querystring,
    Quic,
    Readline,
    Repl,
    Sqlite,
    Stdio,
    Stream,
    StringDecoder,
    Timers,
    Tls,
    Tty,
    Url,
    Util,
    V8,
    Vm,
    Wasm,
    Web,
    Worker,
    Zlib,
}

impl Category {
    pub const ALL: [Category; 40] = [
        Category::Assert,
        Category::Buffer,
        Category::ChildProcess,
        Category::Cluster,
        Category::Console,
        Category::Crypto,
        Category::Dgram,
        Category::Dns,
        Category::Events,
        Category::Fs,
        Category::Http,
        Category::Http2,
        Category::Https,
        Category::Inspector,
        Category::Module,
        Category::Net,
        Category::Os,
        Category::Others,
        Category::Path,
        Category::Process,
        Category::Promise,
        Category::Querystring,
        Category::Quic,
        Category::Readline,
        Category::Repl,
        Category::Sqlite,
        Category::Stdio,
        Category::Stream,
        Category::StringDecoder,
        Category::Timers,
        Category::Tls,
        Category::Tty,
        Category::Url,
        Category::Util,
        Category::V8,
        Category::Vm,
        Category::Wasm,
        Category::Web,
        Category::Worker,
        Category::Zlib,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Category::Assert => "assert",
            Category::Buffer => "buffer",
            Category::ChildProcess => "child-process",
            Category::Cluster => "cluster",
            Category::Console => "console",
            Category::Crypto => "crypto",
            Category::Dgram => "dgram",
            Category::Dns => "dns",
            Category::Events => "events",
            Category::Fs => "fs",
            Category::Http => "http",
            Category::Http2 => "http2",
            Category::Https => "https",
            Category::Inspector => "inspector",
            Category::Module => "module",
            Category::Net => "net",
            Category::Os => "os",
            Category::Others => "others",
            Category::Path => "path",
            Category::Process => "process",
            Category::Promise => "promise",
            Category::Querystring => "querystring",
            Category::Quic => "quic",
            Category::Readline => "readline",
            Category::Repl => "repl",
            Category::Sqlite => "sqlite",
            Category::Stdio => "stdio",
            Category::Stream => "stream",
            Category::StringDecoder => "string-decoder",
            Category::Timers => "timers",
            Category::Tls => "tls",
            Category::Tty => "tty",
            Category::Url => "url",
            Category::Util => "util",
            Category::V8 => "v8",
            Category::Vm => "vm",
            Category::Wasm => "wasm",
            Category::Web => "web",
            Category::Worker => "worker",
            Category::Zlib => "zlib",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Category {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Category::ALL
            .iter()
            .copied()
            .find(|c| c.as_str() == s)
            .ok_or_else(|| format!("unknown category: {s}"))
    }
}

/// Directories whose tests belong to a category regardless of file name.
const DIRECTORY_RULES: &[(&str, Category)] = &[
    ("pseudo-tty", Category::Tty),
    ("module-hooks", Category::Module),
    ("es-module", Category::Module),
];

/// Basename prefixes. Order here is irrelevant; see [`PREFIXES_LONGEST_FIRST`].
const PREFIX_TABLE: &[(&str, Category)] = &[
    ("test-abortcontroller", Category::Web),
    ("test-assert", Category::Assert),
    ("test-blob", Category::Web),
    ("test-buffer", Category::Buffer),
    ("test-child-process", Category::ChildProcess),
    ("test-cluster", Category::Cluster),
    ("test-console", Category::Console),
    ("test-crypto", Category::Crypto),
    ("test-cwd", Category::Process),
    ("test-dgram", Category::Dgram),
    ("test-dns", Category::Dns),
    ("test-double-tls", Category::Tls),
    ("test-event", Category::Events),
    ("test-event-target", Category::Web),
    ("test-eventsource", Category::Web),
    ("test-eventtarget", Category::Web),
    ("test-file", Category::Fs),
    ("test-force-repl", Category::Repl),
    ("test-fs", Category::Fs),
    ("test-http", Category::Http),
    ("test-http2", Category::Http2),
    ("test-https", Category::Https),
    ("test-inspect", Category::Util),
    ("test-inspector", Category::Inspector),
    ("test-listen-fd", Category::Net),
    ("test-mime", Category::Util),
    ("test-module", Category::Module),
    ("test-net", Category::Net),
    ("test-next-tick", Category::Process),
    ("test-outgoing-message", Category::Http),
    ("test-os", Category::Os),
    ("test-path", Category::Path),
    ("test-performance", Category::Web),
    ("test-process", Category::Process),
    ("test-promise", Category::Promise),
    ("test-readable", Category::Stream),
    ("test-querystring", Category::Querystring),
    ("test-quic", Category::Quic),
    ("test-readline", Category::Readline),
    ("test-repl", Category::Repl),
    ("test-require", Category::Module),
    ("test-shadow-realm", Category::Web),
    ("test-socket", Category::Net),
    ("test-sqlite", Category::Sqlite),
    ("test-stdin", Category::Stdio),
    ("test-stdio", Category::Stdio),
    ("test-stdout", Category::Stdio),
    ("test-stream", Category::Stream),
    ("test-string-decoder", Category::StringDecoder),
    ("test-tcp", Category::Net),
    ("test-timers", Category::Timers),
    ("test-tls", Category::Tls),
    ("test-tty", Category::Tty),
    ("test-urlpattern", Category::Web),
    ("test-url", Category::Url),
    ("test-util", Category::Util),
    ("test-v8", Category::V8),
    ("test-vm", Category::Vm),
    ("test-wasm", Category::Wasm),
    ("test-web", Category::Web),
    ("test-whatwg", Category::Web),
    ("test-worker", Category::Worker),
    ("test-zlib", Category::Zlib),
];

/// Prefix table sorted by descending length, ties broken alphabetically.
static PREFIXES_LONGEST_FIRST: Lazy<Vec<(&'static str, Category)>> = Lazy::new(|| {
    let mut entries = PREFIX_TABLE.to_vec();
    entries.sort_by(|(a, _), (b, _)| b.len().cmp(&a.len()).then_with(|| a.cmp(b)));
    entries
});

/// Classify a test identifier. Never fails.
///
/// Directory rules only apply when the name has a directory component.
pub fn classify(name: &str) -> Category {
    if let Some((dir, _)) = name.split_once('/') {
        if let Some((_, category)) = DIRECTORY_RULES.iter().find(|(d, _)| *d == dir) {
            return *category;
        }
    }

    let basename = name.rsplit('/').next().unwrap_or(name);
    PREFIXES_LONGEST_FIRST
        .iter()
        .find(|(prefix, _)| basename.starts_with(prefix))
        .map(|(_, category)| *category)
        .unwrap_or(Category::Others)
}

/// Group test names by category. Groups come back sorted by category name,
/// members keep their input order.
pub fn split_by_category<I, S>(names: I) -> Vec<(Category, Vec<String>)>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut groups: BTreeMap<&'static str, (Category, Vec<String>)> = BTreeMap::new();
    for name in names {
        let name = name.as_ref();
        let category = classify(name);
        groups
            .entry(category.as_str())
            .or_insert_with(|| (category, Vec::new()))
            .1
            .push(name.to_string());
    }
    groups.into_values().collect()
}
