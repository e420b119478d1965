//! Serializable exception chains
//!
//! Events never hold live error objects. Instead an error chain is copied
//! into a [`ThrowableProxy`]: one node per error in the `source()` chain, each
//! with an optional list of stack frames.

use serde::{Deserialize, Serialize};
use std::fmt;

/// One stack frame, rendered as `at class.method(file:line)`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StackFrame {
    pub class_name: String,
    pub method_name: String,
    pub file: Option<String>,
    pub line: Option<u32>,
}

impl StackFrame {
    pub fn new(
        class_name: impl Into<String>,
        method_name: impl Into<String>,
        file: Option<String>,
        line: Option<u32>,
    ) -> Self {
        Self {
            class_name: class_name.into(),
            method_name: method_name.into(),
            file,
            line,
        }
    }

    /// Split a resolved symbol such as `my_crate::net::Server::run` into a
    /// class part and a method part
    fn from_symbol(symbol: &str, file: Option<String>, line: Option<u32>) -> Self {
        // drop the trailing `::h0123abcd` hash rustc appends to legacy symbols
        let symbol = match symbol.rsplit_once("::h") {
            Some((head, hash)) if hash.len() == 16 && hash.chars().all(|c| c.is_ascii_hexdigit()) => head,
            _ => symbol,
        };
        match symbol.rsplit_once("::") {
            Some((class, method)) => Self::new(class, method, file, line),
            None => Self::new("", symbol, file, line),
        }
    }
}

impl fmt::Display for StackFrame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("at ")?;
        if !self.class_name.is_empty() {
            write!(f, "{}.", self.class_name)?;
        }
        f.write_str(&self.method_name)?;
        match (&self.file, self.line) {
            (Some(file), Some(line)) => write!(f, "({}:{})", file, line),
            (Some(file), None) => write!(f, "({})", file),
            _ => f.write_str("(Unknown Source)"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ThrowableProxy {
    pub class_name: String,
    pub message: String,
    pub frames: Vec<StackFrame>,
    pub cause: Option<Box<ThrowableProxy>>,
}

impl ThrowableProxy {
    pub fn new(class_name: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            class_name: class_name.into(),
            message: message.into(),
            frames: Vec::new(),
            cause: None,
        }
    }

    #[must_use]
    pub fn with_frame(mut self, frame: StackFrame) -> Self {
        self.frames.push(frame);
        self
    }

    #[must_use]
    pub fn with_frames(mut self, frames: Vec<StackFrame>) -> Self {
        self.frames = frames;
        self
    }

    #[must_use]
    pub fn with_cause(mut self, cause: ThrowableProxy) -> Self {
        self.cause = Some(Box::new(cause));
        self
    }

    /// Copy an error and its `source()` chain, without frames
    pub fn from_error(error: &(dyn std::error::Error + 'static)) -> Self {
        let mut chain = Vec::new();
        let mut current: Option<&(dyn std::error::Error + 'static)> = Some(error);
        while let Some(err) = current {
            chain.push(Self::new(short_type_name(err), err.to_string()));
            current = err.source();
        }

        let mut proxy: Option<ThrowableProxy> = None;
        while let Some(mut node) = chain.pop() {
            node.cause = proxy.map(Box::new);
            proxy = Some(node);
        }
        // chain always holds at least `error` itself
        proxy.unwrap_or_else(|| Self::new("Error", error.to_string()))
    }

    /// Like [`from_error`](Self::from_error), with the current thread's
    /// resolved backtrace attached to the outermost error
    pub fn capture(error: &(dyn std::error::Error + 'static)) -> Self {
        let mut proxy = Self::from_error(error);
        proxy.frames = capture_frames();
        proxy
    }

    /// Iterate this node and every cause below it
    pub fn chain(&self) -> impl Iterator<Item = &ThrowableProxy> {
        std::iter::successors(Some(self), |tp| tp.cause.as_deref())
    }

    /// Total number of frames across the chain
    pub fn frame_count(&self) -> usize {
        self.chain().map(|tp| tp.frames.len()).sum()
    }
}

impl fmt::Display for ThrowableProxy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (depth, tp) in self.chain().enumerate() {
            if depth > 0 {
                f.write_str("Caused by: ")?;
            }
            writeln!(f, "{}: {}", tp.class_name, tp.message)?;
            for frame in &tp.frames {
                writeln!(f, "\t{}", frame)?;
            }
        }
        Ok(())
    }
}

fn short_type_name(error: &dyn std::error::Error) -> String {
    // Debug output of most error types starts with the type or variant name
    let debug = format!("{:?}", error);
    let end = debug
        .find(|c: char| !(c.is_alphanumeric() || c == '_'))
        .unwrap_or(debug.len());
    if end == 0 {
        "Error".to_string()
    } else {
        debug[..end].to_string()
    }
}

fn capture_frames() -> Vec<StackFrame> {
    let trace = backtrace::Backtrace::new();
    let mut frames = Vec::new();
    for frame in trace.frames() {
        for symbol in frame.symbols() {
            let Some(name) = symbol.name() else {
                continue;
            };
            let name = name.to_string();
            // skip the capture machinery itself
            if name.starts_with("backtrace::") || name.contains("ThrowableProxy::capture") {
                continue;
            }
            let file = symbol
                .filename()
                .and_then(|p| p.file_name())
                .map(|f| f.to_string_lossy().into_owned());
            frames.push(StackFrame::from_symbol(&name, file, symbol.lineno()));
        }
    }
    frames
}
