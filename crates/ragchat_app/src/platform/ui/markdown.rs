//! Terminal rendering of Markdown answers.
//!
//! Headings and strong text are bold, emphasis is italic, inline and fenced
//! code are cyan with fenced blocks indented under their language tag.
//! Lists get bullets or numbers and block quotes a bar.

use pulldown_cmark::{CodeBlockKind, Event, Options, Parser, Tag, TagEnd};

const BOLD: &str = "\x1b[1m";
const ITALIC: &str = "\x1b[3m";
const STRIKE: &str = "\x1b[9m";
const DIM: &str = "\x1b[2m";
const CODE: &str = "\x1b[36m";
const RESET: &str = "\x1b[0m";

const CODE_INDENT: &str = "    ";
const QUOTE_BAR: &str = "│ ";
const BULLET: &str = "• ";
const RULE: &str = "────────────────────";

pub fn render_markdown(source: &str) -> String {
    let mut writer = TerminalWriter::default();
    let parser = Parser::new_ext(source, Options::ENABLE_STRIKETHROUGH | Options::ENABLE_TASKLISTS);
    for event in parser {
        writer.event(event);
    }
    writer.finish()
}

#[derive(Default)]
struct TerminalWriter {
    out: String,
    /// Line prefixes of the enclosing quotes, list items and code blocks.
    prefixes: Vec<String>,
    /// Next number per open list; `None` for bullet lists.
    lists: Vec<Option<u64>>,
    links: Vec<String>,
    in_code_block: bool,
    /// Just wrote a list marker; the item's first block continues that line.
    item_fresh: bool,
}

impl TerminalWriter {
    fn event(&mut self, event: Event<'_>) {
        match event {
            Event::Start(tag) => self.start(tag),
            Event::End(tag) => self.end(tag),
            Event::Text(text) if self.in_code_block => self.code_lines(&text),
            Event::Text(text) => self.write(&text),
            Event::Code(code) => self.write_styled(CODE, &code),
            Event::SoftBreak | Event::HardBreak => self.out.push('\n'),
            Event::Rule => {
                self.block_break();
                self.write(RULE);
                self.end_line();
            }
            Event::Html(html) | Event::InlineHtml(html) => self.write(&html),
            Event::TaskListMarker(done) => self.write(if done { "[x] " } else { "[ ] " }),
            _ => {}
        }
    }

    fn start(&mut self, tag: Tag<'_>) {
        match tag {
            Tag::Paragraph => self.block_break(),
            Tag::Heading { .. } => {
                self.block_break();
                self.style(BOLD);
            }
            Tag::BlockQuote(_) => {
                self.block_break();
                self.prefixes.push(QUOTE_BAR.to_string());
            }
            Tag::CodeBlock(kind) => {
                self.block_break();
                self.prefixes.push(CODE_INDENT.to_string());
                if let CodeBlockKind::Fenced(lang) = kind {
                    if !lang.is_empty() {
                        self.write_styled(DIM, &lang);
                        self.out.push('\n');
                    }
                }
                self.in_code_block = true;
            }
            Tag::List(first) => {
                if self.lists.is_empty() {
                    self.block_break();
                } else {
                    self.end_line();
                }
                self.lists.push(first);
            }
            Tag::Item => {
                self.end_line();
                let marker = match self.lists.last_mut() {
                    Some(Some(number)) => {
                        let marker = format!("{number}. ");
                        *number += 1;
                        marker
                    }
                    _ => BULLET.to_string(),
                };
                self.write(&marker);
                self.prefixes.push(" ".repeat(marker.chars().count()));
                self.item_fresh = true;
            }
            Tag::Emphasis => self.style(ITALIC),
            Tag::Strong => self.style(BOLD),
            Tag::Strikethrough => self.style(STRIKE),
            Tag::Link { dest_url, .. } | Tag::Image { dest_url, .. } => {
                self.links.push(dest_url.to_string());
            }
            _ => {}
        }
    }

    fn end(&mut self, tag: TagEnd) {
        match tag {
            TagEnd::Paragraph => self.end_line(),
            TagEnd::Heading(_) => {
                self.out.push_str(RESET);
                self.end_line();
            }
            TagEnd::BlockQuote(_) => {
                self.prefixes.pop();
                self.end_line();
            }
            TagEnd::CodeBlock => {
                self.in_code_block = false;
                self.prefixes.pop();
                self.end_line();
            }
            TagEnd::List(_) => {
                self.lists.pop();
                self.end_line();
            }
            TagEnd::Item => {
                self.prefixes.pop();
                self.item_fresh = false;
                self.end_line();
            }
            TagEnd::Emphasis | TagEnd::Strong | TagEnd::Strikethrough => {
                self.out.push_str(RESET);
            }
            TagEnd::Link | TagEnd::Image => {
                if let Some(url) = self.links.pop() {
                    self.write(&format!(" ({url})"));
                }
            }
            _ => {}
        }
    }

    fn at_line_start(&self) -> bool {
        self.out.is_empty() || self.out.ends_with('\n')
    }

    fn push_prefix(&mut self) {
        let prefix = self.prefixes.concat();
        self.out.push_str(&prefix);
    }

    fn write(&mut self, text: &str) {
        for (index, line) in text.split('\n').enumerate() {
            if index > 0 {
                self.out.push('\n');
            }
            if line.is_empty() {
                continue;
            }
            if self.at_line_start() {
                self.push_prefix();
            }
            self.out.push_str(line);
            self.item_fresh = false;
        }
    }

    fn write_styled(&mut self, style: &str, text: &str) {
        self.style(style);
        self.out.push_str(text);
        self.out.push_str(RESET);
    }

    fn style(&mut self, style: &str) {
        if self.at_line_start() {
            self.push_prefix();
        }
        self.out.push_str(style);
        self.item_fresh = false;
    }

    fn code_lines(&mut self, text: &str) {
        for line in text.split_inclusive('\n') {
            let body = line.strip_suffix('\n').unwrap_or(line);
            if !body.is_empty() {
                self.write_styled(CODE, body);
            }
            if line.ends_with('\n') {
                self.out.push('\n');
            }
        }
    }

    fn end_line(&mut self) {
        if !self.at_line_start() {
            self.out.push('\n');
        }
    }

    /// Separates blocks by a blank line, or just a line break inside lists.
    fn block_break(&mut self) {
        if self.out.is_empty() || self.item_fresh {
            return;
        }
        self.end_line();
        if self.lists.is_empty() && !self.out.ends_with("\n\n") {
            self.out.push('\n');
        }
    }

    fn finish(self) -> String {
        self.out.trim_end_matches('\n').to_string()
    }
}
