// Text frame layout: segment tokens, `---` boundaries, and the byte frame derivation.
use crate::core::error::{Error, ErrorKind};

pub const FRAME_BOUNDARY: &str = "---";
pub const SEGMENT_START: &str = "<im_start>";
pub const SEGMENT_END: &str = "<im_end>";
pub const DEFAULT_MAX_DEPTH: usize = 256;

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct RenderOptions {
    pub segment_start: String,
    pub segment_end: String,
    /// Nesting level (root is 0) at which a render call fails, for fields and composites alike.
    pub max_depth: usize,
}

impl RenderOptions {
    pub fn new() -> Self {
        Self {
            segment_start: SEGMENT_START.to_string(),
            segment_end: SEGMENT_END.to_string(),
            max_depth: DEFAULT_MAX_DEPTH,
        }
    }

    pub fn with_segment_tokens(mut self, start: impl Into<String>, end: impl Into<String>) -> Self {
        self.segment_start = start.into();
        self.segment_end = end.into();
        self
    }

    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }

    /// Fails with `Render` once an element sits at or below `max_depth`, leaves included.
    pub(crate) fn check_depth(&self, depth: usize) -> Result<(), Error> {
        if depth >= self.max_depth {
            return Err(Error::new(ErrorKind::Render)
                .with_message(format!("nesting exceeds max depth {}", self.max_depth)));
        }
        Ok(())
    }
}

impl Default for RenderOptions {
    fn default() -> Self {
        Self::new()
    }
}

/// Joins segments with start-token lines and terminates with the end-token line.
pub fn join_segments(segments: &[String], options: &RenderOptions) -> String {
    let mut out = String::new();
    for (idx, segment) in segments.iter().enumerate() {
        if idx > 0 {
            out.push('\n');
            out.push_str(&options.segment_start);
            out.push('\n');
        }
        out.push_str(segment);
    }
    if !segments.is_empty() {
        out.push('\n');
    }
    out.push_str(&options.segment_end);
    out
}

/// Trims each line of `text` and wraps the result between boundary lines.
pub fn wrap_boundary(text: &str) -> String {
    let body = text.lines().map(str::trim).collect::<Vec<_>>().join("\n");
    format!("{FRAME_BOUNDARY}\n{body}\n{FRAME_BOUNDARY}")
}

/// Escapes line breaks so caller text stays on the line it was placed on.
pub(crate) fn single_line(text: &str) -> String {
    text.replace('\r', "\\r").replace('\n', "\\n")
}

pub fn encode_bytes(text: &str) -> Vec<u8> {
    wrap_boundary(text).into_bytes()
}

/// Inverse of `encode_bytes` up to whitespace: returns the lines between the boundaries.
pub fn decode_bytes(bytes: &[u8]) -> Result<Vec<String>, Error> {
    let text = std::str::from_utf8(bytes).map_err(|err| {
        Error::new(ErrorKind::Corrupt)
            .with_message("frame is not valid utf-8")
            .with_source(err)
    })?;
    let lines = text.lines().collect::<Vec<_>>();
    if lines.len() < 2 {
        return Err(Error::new(ErrorKind::Corrupt).with_message("frame too short"));
    }
    if lines[0] != FRAME_BOUNDARY {
        return Err(Error::new(ErrorKind::Corrupt).with_message("missing leading frame boundary"));
    }
    if lines[lines.len() - 1] != FRAME_BOUNDARY {
        return Err(Error::new(ErrorKind::Corrupt).with_message("missing trailing frame boundary"));
    }
    Ok(lines[1..lines.len() - 1]
        .iter()
        .map(|line| line.to_string())
        .collect())
}

/// Splits a flat composite rendering (leaf children only) into its segments.
///
/// Nested composites reuse the same tokens, so their frames cannot be split
/// unambiguously; an end token before the last line is rejected.
pub fn split_segments(lines: &[String], options: &RenderOptions) -> Result<Vec<Vec<String>>, Error> {
    let Some((last, body)) = lines.split_last() else {
        return Err(Error::new(ErrorKind::Corrupt).with_message("empty composite frame"));
    };
    if *last != options.segment_end {
        return Err(Error::new(ErrorKind::Corrupt).with_message("missing segment end token"));
    }
    if body.iter().any(|line| *line == options.segment_end) {
        return Err(Error::new(ErrorKind::Corrupt)
            .with_message("nested composite frame cannot be split")
            .with_hint("use the structured view for nested trees"));
    }

    let mut segments = Vec::new();
    let mut current = Vec::new();
    for line in body {
        if *line == options.segment_start {
            segments.push(std::mem::take(&mut current));
        } else {
            current.push(line.clone());
        }
    }
    if !body.is_empty() {
        segments.push(current);
    }
    Ok(segments)
}
