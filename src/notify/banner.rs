//! In-terminal notification banner
//!
//! Posted banners are tracked on a [`BannerBoard`]: newest first, visible
//! for a fixed time, then leaving for a short transition, then removed.

use std::io::{self, Write};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use crossterm::style::{Color, Stylize};
use parking_lot::Mutex;
use tracing::{debug, warn};

use super::{BannerSurface, NotificationRequest};
use crate::config::NotificationsConfig;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BannerPhase {
    Showing,
    Leaving,
}

#[derive(Debug, Clone)]
struct BannerEntry {
    id: u64,
    request: NotificationRequest,
    phase: BannerPhase,
}

/// Live banners and their removal timers
#[derive(Debug)]
pub struct BannerBoard {
    visible_for: Duration,
    transition: Duration,
    next_id: AtomicU64,
    entries: Mutex<Vec<BannerEntry>>,
}

impl BannerBoard {
    pub fn new(visible_for: Duration, transition: Duration) -> Arc<Self> {
        Arc::new(Self {
            visible_for,
            transition,
            next_id: AtomicU64::new(1),
            entries: Mutex::new(Vec::new()),
        })
    }

    pub fn from_config(config: &NotificationsConfig) -> Arc<Self> {
        Self::new(
            Duration::from_secs(config.banner_visible_secs),
            Duration::from_millis(config.banner_transition_ms),
        )
    }

    /// Put a banner on top of the board and schedule its removal
    pub fn post(self: &Arc<Self>, request: NotificationRequest) -> u64 {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        self.entries.lock().insert(
            0,
            BannerEntry {
                id,
                request,
                phase: BannerPhase::Showing,
            },
        );

        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                let board = Arc::clone(self);
                handle.spawn(async move { board.retire(id).await });
            }
            Err(_) => warn!("No async runtime, banner {} stays until the process exits", id),
        }

        id
    }

    async fn retire(&self, id: u64) {
        tokio::time::sleep(self.visible_for).await;
        if let Some(entry) = self.entries.lock().iter_mut().find(|e| e.id == id) {
            entry.phase = BannerPhase::Leaving;
        }

        tokio::time::sleep(self.transition).await;
        self.entries.lock().retain(|e| e.id != id);
        debug!("Banner {} removed", id);
    }

    #[must_use]
    pub fn phase(&self, id: u64) -> Option<BannerPhase> {
        self.entries
            .lock()
            .iter()
            .find(|e| e.id == id)
            .map(|e| e.phase)
    }

    /// Titles of the banners on the board, newest first
    #[must_use]
    pub fn titles(&self) -> Vec<String> {
        self.entries
            .lock()
            .iter()
            .map(|e| e.request.title.clone())
            .collect()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }
}

/// Banner printed to stderr
pub struct TerminalBanner {
    board: Arc<BannerBoard>,
}

impl TerminalBanner {
    pub fn new(board: Arc<BannerBoard>) -> Self {
        Self { board }
    }

    fn accent(category: &str) -> Color {
        match category {
            "rain" => Color::Blue,
            "temp" => Color::Red,
            "welcome" => Color::Green,
            _ => Color::Cyan,
        }
    }
}

impl BannerSurface for TerminalBanner {
    fn show(&self, request: &NotificationRequest) {
        let accent = Self::accent(&request.category);
        let mut stderr = io::stderr().lock();
        let _ = writeln!(
            stderr,
            "{} {}\n  {}",
            "▌".with(accent),
            request.title.as_str().bold(),
            request.body
        );
        self.board.post(request.clone());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(title: &str) -> NotificationRequest {
        NotificationRequest::new(title, "🌧️ Rain expected in 2 hours!", "rain")
    }

    #[tokio::test(start_paused = true)]
    async fn test_banner_lifecycle() {
        let board = BannerBoard::new(Duration::from_secs(5), Duration::from_millis(300));
        let id = board.post(request("Paris, France"));
        assert_eq!(board.phase(id), Some(BannerPhase::Showing));

        tokio::time::sleep(Duration::from_millis(4_900)).await;
        assert_eq!(board.phase(id), Some(BannerPhase::Showing));

        tokio::time::sleep(Duration::from_millis(200)).await;
        assert_eq!(board.phase(id), Some(BannerPhase::Leaving));

        tokio::time::sleep(Duration::from_millis(300)).await;
        assert_eq!(board.phase(id), None);
        assert!(board.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_newest_banner_is_on_top() {
        let board = BannerBoard::new(Duration::from_secs(5), Duration::from_millis(300));
        board.post(request("Paris, France"));
        board.post(request("Oslo, Norway"));
        assert_eq!(board.titles(), vec!["Oslo, Norway", "Paris, France"]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_terminal_banner_posts_to_board() {
        let board = BannerBoard::new(Duration::from_secs(5), Duration::from_millis(300));
        let banner = TerminalBanner::new(board.clone());
        banner.show(&request("Lima, Peru"));
        assert_eq!(board.len(), 1);
    }

    #[test]
    fn test_post_without_runtime_keeps_banner() {
        let board = BannerBoard::new(Duration::from_secs(5), Duration::from_millis(300));
        let id = board.post(request("Quito, Ecuador"));
        assert_eq!(board.phase(id), Some(BannerPhase::Showing));
    }
}
