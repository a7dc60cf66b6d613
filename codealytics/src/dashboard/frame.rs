use std::io;

use unicode_width::UnicodeWidthStr;

use crate::{registry::Registry, types::Identifier};

use super::{terminal::Terminal, DashboardConfiguration};

/// Shown in place of a value that failed to resolve.
pub const UNRESOLVABLE_PLACEHOLDER: &str = "<unresolvable>";

/// One visible metric, resolved to text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Row {
    id: Identifier,
    value: String,
}

/// Resolve every visible metric, in identifier order.
///
/// Providers and `Display` impls run on the calling thread, outside of any
/// registry lock. Either one panicking shows up as the placeholder.
pub(crate) fn resolve_rows(registry: &Registry) -> Vec<Row> {
    registry
        .visible_records()
        .into_iter()
        .map(|(id, record)| {
            let value = match record.representation.render(&id) {
                Ok(value) => value,
                Err(e) => {
                    log::warn!("dashboard could not resolve a metric: {e}");
                    UNRESOLVABLE_PLACEHOLDER.to_string()
                }
            };
            Row { id, value }
        })
        .collect()
}

/// A row placed on screen. `line` and `column` locate the first cell of the
/// value; columns count terminal cells, not chars.
#[derive(Debug, Clone, PartialEq, Eq)]
struct PlacedRow {
    id: Identifier,
    value: String,
    line: usize,
    column: usize,
}

/// What the terminal shows for one tick.
///
/// The full-repaint text is the prefix, one `id: value\n` per row and the
/// suffix, concatenated as given. Banners without a trailing newline share a
/// line with their neighbour, on screen and in snapshots alike.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Frame {
    text: String,
    prefix_len: usize,
    suffix_len: usize,
    rows: Vec<PlacedRow>,
}

impl Frame {
    pub(crate) fn new(configuration: &DashboardConfiguration, rows: Vec<Row>) -> Self {
        let mut text = configuration.prefix.clone();
        let mut line = text.matches('\n').count();
        let mut line_start = text.rfind('\n').map_or(0, |index| index + 1);
        let placed = rows
            .into_iter()
            .map(|row| {
                text.push_str(row.id.as_str());
                text.push_str(": ");
                let column = text[line_start..].width();
                // A row owns exactly one terminal line.
                let value = row.value.replace(['\n', '\r'], " ");
                text.push_str(&value);
                text.push('\n');
                let placed = PlacedRow {
                    id: row.id,
                    value,
                    line,
                    column,
                };
                line += 1;
                line_start = text.len();
                placed
            })
            .collect();
        text.push_str(&configuration.suffix);
        Self {
            text,
            prefix_len: configuration.prefix.len(),
            suffix_len: configuration.suffix.len(),
            rows: placed,
        }
    }

    /// The full-repaint text
    pub(crate) fn text(&self) -> &str {
        &self.text
    }

    pub(crate) fn into_text(self) -> String {
        self.text
    }

    fn prefix(&self) -> &str {
        &self.text[..self.prefix_len]
    }

    fn suffix(&self) -> &str {
        &self.text[self.text.len() - self.suffix_len..]
    }

    /// Whether `next` can be drawn over this frame by rewriting values only.
    fn has_layout_of(&self, next: &Frame) -> bool {
        self.prefix() == next.prefix()
            && self.suffix() == next.suffix()
            && self.rows.len() == next.rows.len()
            && self.rows.iter().zip(&next.rows).all(|(previous, next)| {
                previous.id == next.id
                    && previous.line == next.line
                    && previous.column == next.column
            })
    }
}

/// Draws frames, remembering the last one so unchanged rows are skipped.
#[derive(Debug, Default)]
pub(crate) struct Painter {
    previous: Option<Frame>,
}

impl Painter {
    /// Draw `frame`. `full` forces a clear-and-redraw; without it only changed
    /// values are rewritten, padded to erase the rest of the previous value.
    /// A full repaint also happens when the set of rows changed.
    pub(crate) fn paint(
        &mut self,
        terminal: &mut dyn Terminal,
        frame: Frame,
        full: bool,
    ) -> io::Result<()> {
        // Forget the previous frame until this one is fully on screen.
        let previous = self.previous.take();
        match previous {
            Some(previous) if !full && previous.has_layout_of(&frame) => {
                paint_values(terminal, &previous, &frame)?
            }
            _ => paint_full(terminal, &frame)?,
        }
        terminal.flush()?;
        self.previous = Some(frame);
        Ok(())
    }
}

fn paint_full(terminal: &mut dyn Terminal, frame: &Frame) -> io::Result<()> {
    log::trace!("full dashboard repaint");
    terminal.clear()?;
    for (row, line) in frame.text().lines().enumerate() {
        terminal.write_at(to_u16(row), 0, line)?;
    }
    Ok(())
}

fn paint_values(terminal: &mut dyn Terminal, previous: &Frame, frame: &Frame) -> io::Result<()> {
    for (old, new) in previous.rows.iter().zip(&frame.rows) {
        if old.value == new.value {
            continue;
        }
        let padding = old.value.width().saturating_sub(new.value.width());
        terminal.write_at(
            to_u16(new.line),
            to_u16(new.column),
            &format!("{}{}", new.value, " ".repeat(padding)),
        )?;
    }
    Ok(())
}

fn to_u16(position: usize) -> u16 {
    u16::try_from(position).unwrap_or(u16::MAX)
}
