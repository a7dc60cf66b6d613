use std::{
    fmt::Debug,
    io::{self, Write},
    sync::{Arc, Mutex, PoisonError},
};

use unicode_width::UnicodeWidthChar;

use crossterm::{
    cursor::{Hide, MoveTo, Show},
    queue,
    style::Print,
    terminal::{Clear, ClearType},
};

/// A line-addressed drawing surface for the dashboard.
///
/// Rows and columns are zero based, counted in terminal cells: most chars
/// take one cell, wide ones (CJK, many emoji) take two. Writes may be
/// buffered until `flush()`.
pub trait Terminal: Send {
    /// Erase the whole surface.
    fn clear(&mut self) -> io::Result<()>;

    /// Overwrite the surface starting at `row`/`column` with `text`.
    fn write_at(&mut self, row: u16, column: u16, text: &str) -> io::Result<()>;

    /// Show or hide the cursor while the dashboard is live.
    fn set_cursor_visible(&mut self, visible: bool) -> io::Result<()>;

    /// Push buffered writes out.
    fn flush(&mut self) -> io::Result<()>;
}

/// Draws on a real terminal with cursor addressing.
pub struct CrosstermTerminal<W> {
    out: W,
}

impl<W> Debug for CrosstermTerminal<W> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CrosstermTerminal").finish_non_exhaustive()
    }
}

impl<W: Write + Send> CrosstermTerminal<W> {
    /// Draw to `out`, which should be connected to a terminal.
    pub fn new(out: W) -> Self {
        Self { out }
    }
}

impl CrosstermTerminal<io::Stdout> {
    /// Draw to the process's standard output.
    pub fn stdout() -> Self {
        Self::new(io::stdout())
    }
}

impl<W: Write + Send> Terminal for CrosstermTerminal<W> {
    fn clear(&mut self) -> io::Result<()> {
        queue!(self.out, Clear(ClearType::All), MoveTo(0, 0))
    }

    fn write_at(&mut self, row: u16, column: u16, text: &str) -> io::Result<()> {
        queue!(self.out, MoveTo(column, row), Print(text))
    }

    fn set_cursor_visible(&mut self, visible: bool) -> io::Result<()> {
        if visible {
            queue!(self.out, Show)
        } else {
            queue!(self.out, Hide)
        }
    }

    fn flush(&mut self) -> io::Result<()> {
        self.out.flush()
    }
}

/// An in-memory terminal.
///
/// Clones share one screen, so you can hand one to a dashboard and inspect
/// what it drew through another.
#[derive(Debug, Clone, Default)]
pub struct MemoryTerminal {
    screen: Arc<Mutex<Screen>>,
}

#[derive(Debug, Default)]
struct Screen {
    // One entry per terminal cell. A wide char's second cell holds "".
    lines: Vec<Vec<String>>,
    cursor_hidden: bool,
    clears: usize,
    writes: usize,
}

impl MemoryTerminal {
    /// An empty screen
    pub fn new() -> Self {
        Self::default()
    }

    /// Every line exactly as drawn, trailing padding included.
    pub fn lines(&self) -> Vec<String> {
        self.screen()
            .lines
            .iter()
            .map(|line| line.concat())
            .collect()
    }

    /// The screen as text: one `\n`-terminated line per row, trailing
    /// whitespace trimmed.
    pub fn text(&self) -> String {
        self.lines()
            .iter()
            .map(|line| format!("{}\n", line.trim_end()))
            .collect()
    }

    /// How many times the screen was cleared
    pub fn clear_count(&self) -> usize {
        self.screen().clears
    }

    /// How many positioned writes were made
    pub fn write_count(&self) -> usize {
        self.screen().writes
    }

    /// Whether the cursor is currently visible
    pub fn cursor_visible(&self) -> bool {
        !self.screen().cursor_hidden
    }

    fn screen(&self) -> std::sync::MutexGuard<'_, Screen> {
        self.screen.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Terminal for MemoryTerminal {
    fn clear(&mut self) -> io::Result<()> {
        let mut screen = self.screen();
        screen.lines.clear();
        screen.clears += 1;
        Ok(())
    }

    fn write_at(&mut self, row: u16, column: u16, text: &str) -> io::Result<()> {
        let mut screen = self.screen();
        screen.writes += 1;
        let row = usize::from(row);
        if screen.lines.len() <= row {
            screen.lines.resize_with(row + 1, Vec::new);
        }
        let line = &mut screen.lines[row];
        let mut column = usize::from(column);
        for glyph in text.chars() {
            let width = glyph.width().unwrap_or(0);
            if width == 0 {
                // Combining marks join the cell before them.
                if let Some(cell) = column.checked_sub(1).and_then(|cell| line.get_mut(cell)) {
                    cell.push(glyph);
                }
                continue;
            }
            if line.len() < column + width {
                line.resize(column + width, " ".to_string());
            }
            line[column] = glyph.to_string();
            for continuation in &mut line[column + 1..column + width] {
                continuation.clear();
            }
            column += width;
        }
        Ok(())
    }

    fn set_cursor_visible(&mut self, visible: bool) -> io::Result<()> {
        self.screen().cursor_hidden = !visible;
        Ok(())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}
