//! Chunk wire format.
//!
//! Each resolved boundary travels to the client as one inline script that
//! hands `(id, data)` to a receiver function:
//!
//! ```text
//! <script>__strand_push("user",{"name":"Ada"})</script>
//! ```
//!
//! The receiver side is modelled by [`ChunkRelay`]: chunks that arrive before
//! a consumer connects are buffered and replayed on connect.

use std::fmt;

use strand_types::Chunk;

use crate::errors::RenderError;

/// Receiver function called by every chunk script unless configured otherwise.
pub const DEFAULT_CHUNK_FUNCTION: &str = "__strand_push";

/// Encodes chunks as inline `<script>` calls.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChunkEncoder {
    function: String,
}

impl Default for ChunkEncoder {
    fn default() -> Self {
        Self {
            function: DEFAULT_CHUNK_FUNCTION.to_owned(),
        }
    }
}

impl ChunkEncoder {
    /// An encoder calling `function`, which must be a plain (optionally
    /// dotted) JavaScript identifier such as `window.__push`.
    pub fn new(function: impl Into<String>) -> Result<Self, RenderError> {
        let function = function.into();
        if !is_js_path(&function) {
            return Err(RenderError::InvalidChunkFunction(function));
        }
        Ok(Self { function })
    }

    #[must_use]
    pub fn function(&self) -> &str {
        &self.function
    }

    pub fn encode(&self, chunk: &Chunk) -> Result<String, RenderError> {
        let id = serde_json::to_string(chunk.id.as_str())?;
        let data = serde_json::to_string(&chunk.data)?;
        Ok(format!(
            "<script>{}({},{})</script>",
            self.function,
            escape_script(&id),
            escape_script(&data)
        ))
    }
}

/// Keep JSON text inert inside a script element.
///
/// `</` could close the element and `<!--` switches the HTML parser into its
/// escaped script state. Raw U+2028/U+2029 are line terminators to older JS
/// engines. Every match sits inside a JSON string, where the escaped form
/// evaluates to the same text.
fn escape_script(json: &str) -> String {
    json.replace("</", "<\\/")
        .replace("<!--", "<\\!--")
        .replace('\u{2028}', "\\u2028")
        .replace('\u{2029}', "\\u2029")
}

fn is_js_path(name: &str) -> bool {
    !name.is_empty()
        && name.split('.').all(|part| {
            let mut chars = part.chars();
            chars
                .next()
                .is_some_and(|c| c.is_ascii_alphabetic() || c == '_' || c == '$')
                && chars.all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '$')
        })
}

type Consumer = Box<dyn FnMut(&Chunk)>;

/// Replay-on-connect receiver for streamed chunks.
///
/// A consumer that connects late still sees every chunk, in arrival order.
#[derive(Default)]
pub struct ChunkRelay {
    buffered: Vec<Chunk>,
    consumer: Option<Consumer>,
}

impl ChunkRelay {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, chunk: Chunk) {
        match self.consumer.as_mut() {
            Some(consumer) => consumer(&chunk),
            None => self.buffered.push(chunk),
        }
    }

    /// Accept a chunk in its JSON object form (`{"id": .., "data": ..}`).
    pub fn push_json(&mut self, raw: &str) -> Result<(), RenderError> {
        let chunk: Chunk = serde_json::from_str(raw)?;
        self.push(chunk);
        Ok(())
    }

    /// Attach the consumer, replaying everything buffered so far.
    ///
    /// A second call replaces the consumer; nothing is replayed to it because
    /// the buffer was already drained.
    pub fn connect(&mut self, mut consumer: impl FnMut(&Chunk) + 'static) {
        for chunk in self.buffered.drain(..) {
            consumer(&chunk);
        }
        self.consumer = Some(Box::new(consumer));
    }

    #[must_use]
    pub fn is_connected(&self) -> bool {
        self.consumer.is_some()
    }

    #[must_use]
    pub fn buffered(&self) -> usize {
        self.buffered.len()
    }
}

impl fmt::Debug for ChunkRelay {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ChunkRelay")
            .field("buffered", &self.buffered.len())
            .field("connected", &self.consumer.is_some())
            .finish()
    }
}
