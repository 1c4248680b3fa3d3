/// Signature line whose body the generator is asked to fill in.
pub const CONSTRUCT_MARKER: &str = "def construct(self):";

const FENCE: &str = "```";

/// Body of the scene's construct method, as pulled out of a model reply.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConstructBody {
    /// Everything after the construct signature, untouched.
    Body(String),
    /// The reply had no construct signature. Not an error at this stage.
    MarkerAbsent,
}

impl ConstructBody {
    /// Code text of the body; empty when the marker was absent.
    pub fn code(&self) -> &str {
        match self {
            ConstructBody::Body(code) => code,
            ConstructBody::MarkerAbsent => "",
        }
    }

    pub fn is_marker_absent(&self) -> bool {
        matches!(self, ConstructBody::MarkerAbsent)
    }
}

/// Return the trimmed interior of the first fenced block, or the whole reply when
/// there is none.
pub fn extract_code(reply: &str) -> &str {
    let Some(open) = reply.find(FENCE) else {
        return reply;
    };
    let inner_start = open + FENCE.len();
    match reply[inner_start..].find(FENCE) {
        Some(close) => reply[inner_start..inner_start + close].trim(),
        None => reply,
    }
}

/// Return everything following the first construct signature.
pub fn extract_construct_body(code: &str) -> ConstructBody {
    match code.find(CONSTRUCT_MARKER) {
        Some(pos) => ConstructBody::Body(code[pos + CONSTRUCT_MARKER.len()..].to_string()),
        None => ConstructBody::MarkerAbsent,
    }
}
