use std::fmt::Write;

/// Text rendering target for result rows. Columns push their own items;
/// nested columns bracket and separate their children's items.
#[derive(Debug, Default, Clone)]
pub struct RowBuffer {
    data: String,
    depth: usize,
}

impl RowBuffer {
    pub fn new() -> Self {
        RowBuffer::default()
    }

    pub fn as_str(&self) -> &str {
        &self.data
    }

    pub fn clear(&mut self) {
        self.data.clear();
        self.depth = 0;
    }

    pub fn begin_push_bracket(&mut self) {
        self.data.push('{');
        self.depth += 1;
    }

    pub fn finish_push_bracket(&mut self) {
        assert!(self.depth > 0, "unbalanced row buffer bracket");
        self.depth -= 1;
        self.data.push('}');
    }

    pub fn separator(&mut self, c: char) {
        self.data.push(c);
    }

    pub fn push_null(&mut self) {
        self.data.push_str("null");
    }

    pub fn push_number<T: std::fmt::Display>(&mut self, v: T) {
        // Writing into a String cannot fail.
        let _ = write!(self.data, "{}", v);
    }

    pub fn push_string(&mut self, bytes: &[u8], quote: char) {
        self.data.push(quote);
        for ch in String::from_utf8_lossy(bytes).chars() {
            if ch == quote || ch == '\\' {
                self.data.push('\\');
            }
            self.data.push(ch);
        }
        self.data.push(quote);
    }
}
