//! Interactive mapping shell.
//!
//! Reads one command per line; a failing command is reported and the loop
//! keeps going. Only `quit` or end of input ends the session.

use anyhow::{Context, Result};
use chrono::Local;
use colored::Colorize;
use indicatif::{ProgressBar, ProgressStyle};
use std::io::{self, BufRead, Write};
use std::time::Duration;

use crate::driver::traits::{Navigate, PageDriver};
use crate::mapper::{self, ElementCandidate, ElementMeta, Mapper, RevalidationResult, SaveContext};
use crate::storage::RecordStore;
use crate::utils::audit::AuditLog;
use crate::utils::identity;

const SELECTOR_PREVIEW: usize = 80;
const NAME_PREVIEW: usize = 40;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Open(String),
    Url,
    Scan,
    List,
    Rank,
    Walk,
    Capture(usize),
    Test(String),
    Clear,
    Reload,
    Help,
    Quit,
}

/// Parse one input line; blank lines yield `None`
pub fn parse_command(line: &str) -> Result<Option<Command>> {
    let line = line.trim();
    if line.is_empty() {
        return Ok(None);
    }
    let (verb, rest) = match line.split_once(char::is_whitespace) {
        Some((v, r)) => (v, r.trim()),
        None => (line, ""),
    };

    let command = match verb.to_lowercase().as_str() {
        "open" | "goto" => {
            if rest.is_empty() {
                anyhow::bail!("usage: open <url>");
            }
            Command::Open(rest.to_string())
        }
        "url" => Command::Url,
        "scan" => Command::Scan,
        "list" | "ls" => Command::List,
        "rank" => Command::Rank,
        "walk" => Command::Walk,
        "capture" | "save" => {
            let index = rest
                .parse::<usize>()
                .with_context(|| format!("usage: capture <index> (got '{}')", rest))?;
            Command::Capture(index)
        }
        "test" => {
            if rest.is_empty() {
                anyhow::bail!("usage: test <file>");
            }
            Command::Test(rest.to_string())
        }
        "clear" => Command::Clear,
        "reload" => Command::Reload,
        "help" | "?" => Command::Help,
        "quit" | "exit" | "q" => Command::Quit,
        other => anyhow::bail!("Unknown command: {} (type 'help')", other),
    };
    Ok(Some(command))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WalkKey {
    Next,
    Previous,
    Capture,
    Skip,
    Quit,
}

pub fn parse_walk_key(line: &str) -> Option<WalkKey> {
    match line.trim().to_lowercase().as_str() {
        "" | "n" => Some(WalkKey::Next),
        "p" => Some(WalkKey::Previous),
        "c" => Some(WalkKey::Capture),
        "s" => Some(WalkKey::Skip),
        "q" => Some(WalkKey::Quit),
        _ => None,
    }
}

fn preview(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        let cut: String = s.chars().take(max.saturating_sub(1)).collect();
        format!("{}…", cut)
    }
}

/// One listing line: index, score, tag, role, kind, name, preferred selector
pub fn format_row(meta: &ElementMeta) -> String {
    let kind = meta.field.as_ref().map(|f| f.kind.as_str()).unwrap_or("-");
    format!(
        "[{:>3}] {:>3}  {:<8} {:<10} {:<18} {:<40}  {}",
        meta.index,
        meta.score,
        meta.tag,
        meta.role.as_deref().unwrap_or("-"),
        kind,
        preview(&meta.display_name(NAME_PREVIEW), NAME_PREVIEW),
        preview(meta.selectors.preferred(), SELECTOR_PREVIEW),
    )
}

fn print_help() {
    println!("{}", "Commands:".bold());
    println!("  open <url>      Navigate to a page");
    println!("  url             Show the current page URL");
    println!("  scan            Find interactive elements in every frame");
    println!("  list            List scanned elements in page order");
    println!("  rank            List scanned elements by robustness score");
    println!("  walk            Step through elements (N)ext (P)rev (C)apture (S)kip (Q)uit");
    println!("  capture <idx>   Save an element to a JSON record");
    println!("  test <file>     Re-locate a saved element on the current page");
    println!("  clear           Remove highlights");
    println!("  reload          Reload the page");
    println!("  help            Show this help");
    println!("  quit            Leave the shell");
}

pub struct Shell<D: PageDriver + Navigate> {
    mapper: Mapper<D>,
    store: RecordStore,
    audit: AuditLog,
    session: String,
    candidates: Vec<ElementCandidate<D::Element>>,
}

impl<D: PageDriver + Navigate> Shell<D> {
    pub fn new(driver: D, store: RecordStore, audit: AuditLog, session: String) -> Self {
        Self {
            mapper: Mapper::new(driver),
            store,
            audit,
            session,
            candidates: Vec::new(),
        }
    }

    /// Run the command loop until `quit` or end of input
    pub async fn run<R: BufRead>(&mut self, input: &mut R) -> Result<()> {
        println!("\n{}", "=== lumi-mapper Interactive Shell ===".bold().green());
        println!("Type 'help' for commands, 'quit' to leave.\n");

        loop {
            let Some(line) = prompt(input, &format!("{}", "lumi-mapper>".blue().bold()))? else {
                break;
            };
            let command = match parse_command(&line) {
                Ok(Some(command)) => command,
                Ok(None) => continue,
                Err(e) => {
                    println!("{} {}", "⚠".yellow(), e);
                    continue;
                }
            };
            if command == Command::Quit {
                break;
            }
            if let Err(e) = self.execute(command, input).await {
                self.audit.error(&format!("{:#}", e));
            }
        }

        if let Err(e) = self.mapper.clear_highlights().await {
            log::debug!("Final clear failed: {}", e);
        }
        self.audit.info("session end");
        Ok(())
    }

    async fn execute<R: BufRead>(&mut self, command: Command, input: &mut R) -> Result<()> {
        match command {
            Command::Open(url) => {
                let opened = self.mapper.driver().open(&url).await?;
                self.candidates.clear();
                self.audit.success(&format!("open {}", opened));
            }
            Command::Url => {
                let url = self.mapper.driver().current_url().await?;
                println!("{}", url.cyan());
            }
            Command::Scan => self.scan().await?,
            Command::List => {
                self.require_scan()?;
                for candidate in &self.candidates {
                    println!("{}", format_row(&candidate.meta));
                }
            }
            Command::Rank => {
                self.require_scan()?;
                for i in mapper::rank(&self.candidates) {
                    println!("{}", format_row(&self.candidates[i].meta));
                }
            }
            Command::Walk => self.walk(input).await?,
            Command::Capture(index) => self.capture(index, input).await?,
            Command::Test(file) => self.test(&file).await?,
            Command::Clear => {
                for w in self.mapper.clear_highlights().await? {
                    self.audit.warn(&w.to_string());
                }
                println!("{} Highlights cleared", "🧹".cyan());
            }
            Command::Reload => {
                self.mapper.driver().reload().await?;
                self.candidates.clear();
                self.audit.info("reload");
            }
            Command::Help => print_help(),
            Command::Quit => {}
        }
        Ok(())
    }

    fn require_scan(&self) -> Result<()> {
        if self.candidates.is_empty() {
            anyhow::bail!("Nothing scanned yet (run 'scan')");
        }
        Ok(())
    }

    async fn scan(&mut self) -> Result<()> {
        let spinner = ProgressBar::new_spinner();
        spinner.set_style(ProgressStyle::default_spinner().tick_chars("⠋⠙⠹⠸⠼⠴⠦⠧⠇⠏ "));
        spinner.set_message("Scanning frames...");
        spinner.enable_steady_tick(Duration::from_millis(80));
        let report = self.mapper.scan().await;
        spinner.finish_and_clear();

        let report = report.context("Scan failed")?;
        for w in &report.warnings {
            self.audit.warn(&w.to_string());
        }
        self.audit.success(&format!(
            "scan: {} elements in {} frames ({} warnings)",
            report.candidates.len(),
            report.frames_scanned,
            report.warnings.len()
        ));
        self.candidates = report.candidates;
        Ok(())
    }

    async fn highlight(&mut self, index: usize) -> Result<()> {
        let warnings = self
            .mapper
            .highlight_candidate(&self.candidates[index])
            .await?;
        for w in warnings {
            self.audit.warn(&w.to_string());
        }
        Ok(())
    }

    async fn walk<R: BufRead>(&mut self, input: &mut R) -> Result<()> {
        self.require_scan()?;
        let mut current = 0usize;
        loop {
            self.highlight(current).await?;
            println!("{}", format_row(&self.candidates[current].meta));
            let Some(line) = prompt(input, "  [N]ext [P]rev [C]apture [S]kip [Q]uit >")? else {
                break;
            };
            match parse_walk_key(&line) {
                Some(WalkKey::Next) | Some(WalkKey::Skip) => {}
                Some(WalkKey::Previous) => {
                    current = current.saturating_sub(1);
                    continue;
                }
                Some(WalkKey::Capture) => self.capture(current, input).await?,
                Some(WalkKey::Quit) => break,
                None => {
                    println!("{} Unknown key: {}", "⚠".yellow(), line.trim());
                    continue;
                }
            }
            if current + 1 >= self.candidates.len() {
                println!("{} End of list", "ℹ".blue());
                break;
            }
            current += 1;
        }
        self.mapper.clear_highlights().await?;
        Ok(())
    }

    async fn capture<R: BufRead>(&mut self, index: usize, input: &mut R) -> Result<()> {
        if index >= self.candidates.len() {
            anyhow::bail!(
                "No element with index {} ({} scanned)",
                index,
                self.candidates.len()
            );
        }
        let name = prompt(input, "  File name (empty to cancel):")?.unwrap_or_default();
        if name.trim().is_empty() {
            println!("{} Capture cancelled", "ℹ".blue());
            return Ok(());
        }

        let ctx = SaveContext {
            saved_at: Local::now(),
            page_url: self.mapper.driver().current_url().await?,
            machine_user: identity::machine_user(),
            machine_host: identity::machine_host(),
            session: self.session.clone(),
        };
        let record = mapper::capture(&self.candidates[index], &ctx);
        let path = self.store.save(&record, &name)?;
        self.audit.success(&format!(
            "saved [{}] {} -> {}",
            index,
            record.element.tag,
            path.display()
        ));
        Ok(())
    }

    async fn test(&mut self, file: &str) -> Result<()> {
        let record = self.store.load(file)?;
        // Earlier overlays go first so a miss shows none
        for w in self.mapper.clear_highlights().await? {
            self.audit.warn(&w.to_string());
        }
        let result = self.mapper.test(&record).await?;
        for w in &result.warnings {
            self.audit.warn(&w.to_string());
        }
        let verdict = describe_verdict(file, &result);
        if result.located {
            self.audit.success(&verdict);
        } else {
            self.audit.warn(&verdict);
        }
        Ok(())
    }
}

/// One-line summary of a revalidation
pub fn describe_verdict<E>(file: &str, result: &RevalidationResult<E>) -> String {
    match result.used_strategy {
        Some(strategy) if result.located => {
            let drift = match result.score_drift() {
                Some(0) | None => String::new(),
                Some(d) => format!(", score drift {:+}", d),
            };
            format!(
                "test {}: FOUND via {} (frame match: {}, score {} -> {}{})",
                file,
                strategy,
                if result.frame_match { "yes" } else { "no" },
                result.captured_score,
                result.current_score.unwrap_or(0),
                drift
            )
        }
        _ => format!("test {}: NOT FOUND", file),
    }
}

/// Print a prompt and read one line; `None` on end of input
fn prompt<R: BufRead>(input: &mut R, label: &str) -> Result<Option<String>> {
    print!("{} ", label);
    io::stdout().flush()?;
    let mut line = String::new();
    if input.read_line(&mut line)? == 0 {
        return Ok(None);
    }
    Ok(Some(line.trim_end_matches(['\r', '\n']).to_string()))
}
