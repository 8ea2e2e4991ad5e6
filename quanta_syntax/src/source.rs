use std::{
    fs::File,
    io::{self, BufRead, BufReader, Write},
    path::Path,
};

use log::debug;

/// Line that ends a program typed in interactively.
pub const END_OF_TEXT: &str = "DONE";

/// Yields program text one line at a time.
pub trait Source {
    fn read_line(&mut self) -> io::Result<String>;
    fn is_end_of_text(&self) -> bool;
}

/// Reads lines from a file or any other buffered reader.
/// The text ends once a read comes back empty.
#[derive(Debug)]
pub struct FileSource<R> {
    reader: R,
    eof: bool,
}

impl FileSource<BufReader<File>> {
    pub fn open(path: impl AsRef<Path>) -> io::Result<Self> {
        Ok(Self::new(BufReader::new(File::open(path)?)))
    }
}

impl<R: BufRead> FileSource<R> {
    pub fn new(reader: R) -> Self {
        Self { reader, eof: false }
    }
}

impl<R: BufRead> Source for FileSource<R> {
    fn read_line(&mut self) -> io::Result<String> {
        let mut line = String::default();
        if self.reader.read_line(&mut line)? == 0 {
            self.eof = true;
        }
        Ok(trim_newline(line))
    }

    fn is_end_of_text(&self) -> bool {
        self.eof
    }
}

/// Prompts for lines until the `DONE` sentinel (or the end of the stream).
#[derive(Debug)]
pub struct InteractiveSource<R, W> {
    reader: R,
    prompt: W,
    eof: bool,
}

impl<R: BufRead, W: Write> InteractiveSource<R, W> {
    pub fn new(reader: R, prompt: W) -> Self {
        Self {
            reader,
            prompt,
            eof: false,
        }
    }
}

impl<R: BufRead, W: Write> Source for InteractiveSource<R, W> {
    fn read_line(&mut self) -> io::Result<String> {
        write!(self.prompt, "> ")?;
        self.prompt.flush()?;
        let mut line = String::default();
        let n = self.reader.read_line(&mut line)?;
        let line = trim_newline(line);
        // If zero bytes are read, then exit (usually triggered by Ctrl-D)
        if n == 0 || line == END_OF_TEXT {
            self.eof = true;
            return Ok(String::default());
        }
        Ok(line)
    }

    fn is_end_of_text(&self) -> bool {
        self.eof
    }
}

/// Drains a source into the full program text handed to the lexer.
pub fn read_program(source: &mut impl Source) -> io::Result<String> {
    let mut text = String::default();
    loop {
        let line = source.read_line()?;
        if source.is_end_of_text() {
            break;
        }
        text.push_str(&line);
        text.push('\n');
    }
    debug!("Read {} lines of source", text.lines().count());
    Ok(text)
}

fn trim_newline(mut line: String) -> String {
    if line.ends_with('\n') {
        line.pop();
        if line.ends_with('\r') {
            line.pop();
        }
    }
    line
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn file_source() {
        let mut source = FileSource::new(Cursor::new("int x = 1;\r\nx;\n"));
        assert_eq!(source.read_line().unwrap(), "int x = 1;");
        assert!(!source.is_end_of_text());
        assert_eq!(source.read_line().unwrap(), "x;");
        assert_eq!(source.read_line().unwrap(), "");
        assert!(source.is_end_of_text());
    }

    #[test]
    fn file_program() {
        let mut source = FileSource::new(Cursor::new("1;\n\n2;"));
        assert_eq!(read_program(&mut source).unwrap(), "1;\n\n2;\n");
    }

    #[test]
    fn interactive_program_stops_at_sentinel() {
        let mut prompt = Vec::new();
        let mut source =
            InteractiveSource::new(Cursor::new("int x = 2;\nx;\nDONE\nignored;\n"), &mut prompt);
        assert_eq!(read_program(&mut source).unwrap(), "int x = 2;\nx;\n");
        assert!(source.is_end_of_text());
        drop(source);
        assert_eq!(String::from_utf8(prompt).unwrap(), "> > > ");
    }

    #[test]
    fn interactive_program_stops_at_end_of_stream() {
        let mut source = InteractiveSource::new(Cursor::new("1;\n"), io::sink());
        assert_eq!(read_program(&mut source).unwrap(), "1;\n");
    }
}
