use zeroize::Zeroizing;

/// The text console seam. The real widget set (selection menu, yes/no box,
/// alert box, password line editor) lives with the firmware console
/// protocols; this is the blocking contract the manager needs from it.
pub trait Console {
    fn clear(&mut self);

    /// Single-message alert, acknowledged by the operator before returning.
    fn notify(&mut self, msg: &str);

    /// Multi-line alert box, acknowledged by the operator.
    fn alert(&mut self, lines: &[String]);

    /// Inline text on the current line, no newline. Used for password
    /// prompts.
    fn prompt(&mut self, text: &str);

    /// A full feedback line ("Password doesn't match").
    fn line(&mut self, text: &str);

    fn yes_no(&mut self, prompt: &str) -> bool;

    /// Selection menu; `None` when the operator backs out.
    fn select(&mut self, title: &str, items: &[String]) -> Option<usize>;

    /// Blocking line read in UTF-16 code units: backspace honored, nothing
    /// echoed, input beyond `max` units dropped. The empty line is a valid
    /// return; callers decide whether to accept it.
    fn read_line_hidden(&mut self, max: usize) -> Zeroizing<Vec<u16>>;

    /// Blocking single-character read, no echo.
    fn read_char_hidden(&mut self) -> Option<char>;
}
