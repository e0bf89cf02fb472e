/// A tokenized command line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Cmd<'a> {
    pub args: Vec<&'a str>,
    pub background: bool, // Trailing `&`
}

impl<'a> Cmd<'a> {
    pub fn name(&self) -> Option<&'a str> {
        self.args.first().copied()
    }

    pub fn is_empty(&self) -> bool {
        self.args.is_empty()
    }
}

/// Split a raw line into arguments.
///
/// Tokens are separated by whitespace. A token starting with `'` runs up to the
/// next `'` (or the end of the line) and may contain spaces. A standalone `&`
/// at the end asks for a background job and is dropped from the arguments.
pub fn parse_cmd(line: &str) -> Cmd<'_> {
    let mut args = Vec::new();
    let mut rest = line.trim_start();

    while !rest.is_empty() {
        let (token, remainder) = match rest.strip_prefix('\'') {
            Some(quoted) => match quoted.find('\'') {
                Some(end) => (&quoted[..end], &quoted[end + 1..]),
                None => (quoted, ""),
            },
            None => match rest.find(char::is_whitespace) {
                Some(end) => (&rest[..end], &rest[end..]),
                None => (rest, ""),
            },
        };
        args.push(token);
        rest = remainder.trim_start();
    }

    let background = args.last() == Some(&"&");
    if background {
        args.pop();
    }
    Cmd { args, background }
}
