/// Ordered sink for the generated source. Sections append in pass order and
/// the buffer is only surrendered on a fully successful translation.
#[derive(Debug, Default)]
pub(crate) struct SourceSink {
    buf: String,
}

impl SourceSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn line(&mut self, text: &str) {
        self.buf.push_str(text);
        self.buf.push('\n');
    }

    pub fn clear(&mut self) {
        self.buf.clear();
    }

    pub fn take(&mut self) -> String {
        std::mem::take(&mut self.buf)
    }
}
