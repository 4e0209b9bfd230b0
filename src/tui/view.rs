use ratatui::Frame;
use ratatui::layout::{Constraint, Direction, Layout, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Paragraph};

use super::DisplayState;

// the view draws whatever snapshot it's handed; no model access here
pub fn render(frame: &mut Frame, area: Rect, ds: &DisplayState) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(2), // header: transport + tempo
            Constraint::Min(3),    // track rows
            Constraint::Length(2), // footer: keys + notice
        ])
        .split(area);

    render_header(frame, chunks[0], ds);
    render_tracks(frame, chunks[1], ds);
    render_footer(frame, chunks[2], ds);
}

fn render_header(frame: &mut Frame, area: Rect, ds: &DisplayState) {
    let transport = if ds.recording {
        Span::styled("● REC", Style::default().fg(Color::Red).add_modifier(Modifier::BOLD))
    } else if ds.mix_playing {
        Span::styled("▶ PLAY", Style::default().fg(Color::Green))
    } else {
        Span::styled("■ STOP", Style::default().fg(Color::DarkGray))
    };

    let position = match ds.position_secs {
        Some(pos) => format!("  {pos:5.1}s / {:.1}s", ds.total_secs),
        None => format!("  --.-s / {:.1}s", ds.total_secs),
    };

    let line = Line::from(vec![
        Span::raw(" beatline  "),
        transport,
        Span::raw(position),
        Span::raw(format!("   tempo {} bpm", ds.tempo_bpm)),
        Span::raw(format!("   cursor {:.1}s", ds.cursor_secs)),
    ]);
    frame.render_widget(Paragraph::new(line), area);
}

fn render_tracks(frame: &mut Frame, area: Rect, ds: &DisplayState) {
    let block = Block::default().borders(Borders::TOP);
    let inner = block.inner(area);
    frame.render_widget(block, area);

    let mut lines = Vec::with_capacity(ds.tracks.len());
    for (i, track) in ds.tracks.iter().enumerate() {
        let selected = i == ds.selected;
        let marker = if selected { ">" } else { " " };
        let state = format!(
            "{}{}{}",
            if track.muted { "M" } else { "-" },
            if track.looping { "L" } else { "-" },
            if track.playing { "▶" } else { " " },
        );
        let label = format!(
            "{marker} {:>2} [{state}] vol {:>3.0}% ",
            i + 1,
            track.volume * 100.0
        );

        let label_style = if selected {
            Style::default().add_modifier(Modifier::BOLD)
        } else {
            Style::default()
        };

        let mut spans = vec![Span::styled(label, label_style)];
        spans.extend(event_lane(track, ds, inner.width));
        lines.push(Line::from(spans));
    }
    frame.render_widget(Paragraph::new(lines), inner);
}

/// Draw one track's events as colored bars on a proportional lane.
fn event_lane(track: &super::TrackView, ds: &DisplayState, width: u16) -> Vec<Span<'static>> {
    const LABEL_COLS: u16 = 22;
    let lane_cols = width.saturating_sub(LABEL_COLS).max(10) as usize;
    let secs_per_col = ds.total_secs / lane_cols as f32;

    let mut cells: Vec<Option<(u8, u8, u8)>> = vec![None; lane_cols];
    for ev in &track.events {
        let start = (ev.start_secs / secs_per_col) as usize;
        let len = ((ev.duration_secs / secs_per_col) as usize).max(1);
        for cell in cells.iter_mut().skip(start).take(len) {
            *cell = Some(ev.color);
        }
    }

    // playhead and cursor overlay
    let playhead = ds.position_secs.map(|p| (p / secs_per_col) as usize);
    let cursor = (ds.cursor_secs / secs_per_col) as usize;

    cells
        .into_iter()
        .enumerate()
        .map(|(col, cell)| {
            if playhead == Some(col) {
                return Span::styled("|", Style::default().fg(Color::White));
            }
            match cell {
                Some((r, g, b)) => Span::styled("█", Style::default().fg(Color::Rgb(r, g, b))),
                None if col == cursor => Span::styled("·", Style::default().fg(Color::Gray)),
                None => Span::raw(" "),
            }
        })
        .collect()
}

fn render_footer(frame: &mut Frame, area: Rect, ds: &DisplayState) {
    let keys = " space play  p track  r rec  s export  t add  del remove  m mute  l loop  1-0 q w place  [ ] cursor  x del event  , . nudge  < > ev vol  c clear  esc quit";
    let mut lines = vec![Line::from(Span::styled(
        keys,
        Style::default().fg(Color::DarkGray),
    ))];
    if let Some(notice) = &ds.notice {
        let style = if ds.confirm_clear {
            Style::default().fg(Color::Red)
        } else {
            Style::default().fg(Color::Yellow)
        };
        lines.push(Line::from(Span::styled(format!(" {notice}"), style)));
    }
    frame.render_widget(Paragraph::new(lines), area);
}
