//! [`CourseScraper`] backed by an external helper program.
//!
//! Invoked as `<scraper_command…> <course-url> <capture-path> <login-timeout-secs>`.
//! The helper writes the network capture to `<capture-path>` and prints a
//! JSON object with `player_description`, `lectures` and `slides` on stdout.

use anyhow::{Context, Result};
use std::io::Read;
use std::path::PathBuf;
use std::process::{Command, Stdio};
use std::time::{Duration, Instant};

use super::{CourseScraper, HelperOutput, ScrapedCourse};
use crate::config::Settings;

const POLL_INTERVAL: Duration = Duration::from_millis(100);

#[derive(Debug, Clone)]
pub struct CommandScraper {
    command: Vec<String>,
    capture_path: PathBuf,
    login_timeout: Duration,
    /// Upper bound for the whole helper run, login included.
    deadline: Duration,
}

impl CommandScraper {
    pub fn new(
        command: Vec<String>,
        capture_path: PathBuf,
        login_timeout: Duration,
        scrape_timeout: Duration,
    ) -> Self {
        Self {
            command,
            capture_path,
            login_timeout,
            deadline: login_timeout + scrape_timeout,
        }
    }

    /// Helper from the configuration; the capture lands next to the cache database.
    pub fn from_settings(settings: &Settings) -> Self {
        Self::new(
            settings.scraper_command.clone(),
            settings.cache_db.with_file_name("net_log.json"),
            settings.login_timeout,
            settings.scrape_timeout,
        )
    }

    fn run(&self, course_url: &str) -> Result<Vec<u8>> {
        let (program, args) = self
            .command
            .split_first()
            .context("scraper_command is empty")?;
        if let Some(parent) = self.capture_path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        // A stale capture from an earlier run must not be mistaken for this one.
        if self.capture_path.exists() {
            std::fs::remove_file(&self.capture_path)?;
        }

        let mut cmd = Command::new(program);
        cmd.args(args)
            .arg(course_url)
            .arg(&self.capture_path)
            .arg(self.login_timeout.as_secs().to_string())
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::inherit());
        tracing::debug!("executing scraper: {cmd:?}");
        let mut child = cmd
            .spawn()
            .with_context(|| format!("failed to start scraper {program}"))?;

        let mut stdout = child.stdout.take().context("scraper stdout not captured")?;
        let reader = std::thread::spawn(move || {
            let mut buf = Vec::new();
            stdout.read_to_end(&mut buf).map(|_| buf)
        });

        let started = Instant::now();
        let status = loop {
            if let Some(status) = child.try_wait()? {
                break status;
            }
            if started.elapsed() > self.deadline {
                let _ = child.kill();
                let _ = child.wait();
                anyhow::bail!(
                    "scraper did not finish within {}s (login and scraping)",
                    self.deadline.as_secs()
                );
            }
            std::thread::sleep(POLL_INTERVAL);
        };

        let out = reader
            .join()
            .map_err(|_| anyhow::anyhow!("scraper stdout reader panicked"))??;
        tracing::debug!(%status, stdout_bytes = out.len(), "scraper finished");
        if !status.success() {
            anyhow::bail!("scraper exited with {status}");
        }
        Ok(out)
    }
}

impl CourseScraper for CommandScraper {
    fn scrape(&mut self, course_url: &str) -> Result<ScrapedCourse> {
        let stdout = self.run(course_url)?;
        let output: HelperOutput =
            serde_json::from_slice(&stdout).context("scraper output is not the expected JSON")?;
        let capture = std::fs::read(&self.capture_path).with_context(|| {
            format!(
                "scraper wrote no network capture at {}",
                self.capture_path.display()
            )
        })?;
        tracing::info!(
            lectures = output.lectures.len(),
            slide_sets = output.slides.len(),
            capture_bytes = capture.len(),
            "scraped course"
        );
        Ok(ScrapedCourse {
            player_description: output.player_description,
            lectures: output.lectures,
            slides: output.slides,
            capture,
        })
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;

    fn sh(script: &str) -> Vec<String> {
        vec![
            "sh".to_string(),
            "-c".to_string(),
            script.to_string(),
            "helper".to_string(),
        ]
    }

    #[test]
    fn runs_helper_and_reads_capture() {
        let dir = tempfile::tempdir().unwrap();
        let script = r#"
            printf '{"events":[]}' > "$2"
            printf '{"player_description":"HUDCE Publication Listing","lectures":[{"title":"L1","page_url":"%s?id=b1"}]}' "$1"
        "#;
        let mut scraper = CommandScraper::new(
            sh(script),
            dir.path().join("net_log.json"),
            Duration::from_secs(5),
            Duration::from_secs(5),
        );
        let course = scraper.scrape("https://lms.example/courses/7/tools").unwrap();
        assert_eq!(course.player_description.as_deref(), Some("HUDCE Publication Listing"));
        assert_eq!(course.lectures.len(), 1);
        assert_eq!(course.lectures[0].page_url, "https://lms.example/courses/7/tools?id=b1");
        assert!(course.slides.is_empty());
        assert_eq!(course.capture, b"{\"events\":[]}");
    }

    #[test]
    fn helper_failures_surface() {
        let dir = tempfile::tempdir().unwrap();
        let capture = dir.path().join("net_log.json");

        let mut failing = CommandScraper::new(sh("exit 3"), capture.clone(), Duration::from_secs(5), Duration::ZERO);
        assert!(failing.scrape("https://lms.example/courses/7").is_err());

        let mut no_capture = CommandScraper::new(
            sh(r#"printf '{"lectures":[]}'"#),
            capture.clone(),
            Duration::from_secs(5),
            Duration::ZERO,
        );
        let err = no_capture.scrape("https://lms.example/courses/7").unwrap_err();
        assert!(format!("{err:#}").contains("no network capture"));

        let mut slow = CommandScraper::new(
            sh("sleep 5"),
            capture,
            Duration::from_millis(100),
            Duration::from_millis(100),
        );
        let started = Instant::now();
        let err = slow.scrape("https://lms.example/courses/7").unwrap_err();
        assert!(err.to_string().contains("did not finish"));
        assert!(started.elapsed() < Duration::from_secs(4));
    }
}
