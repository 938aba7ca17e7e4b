use std::collections::VecDeque;

/// Frames kept for the rolling averages
const HISTORY: usize = 72;

/// Rolling frame statistics for the once-a-second report
#[derive(Debug, Clone)]
pub struct PerformanceMonitor {
    // CPU time per frame, most recent last
    frame_times: VecDeque<f32>,
    draw_counts: VecDeque<usize>,

    pub avg_frame_time_ms: f32,
    pub max_frame_time_ms: f32,
    /// Frame rate the CPU side could sustain
    pub cpu_bound_fps: f32,
    pub avg_draws: f32,

    pub total_frames: u64,
    pub total_draws: u64,
    pub open_menus: usize,
    pub focused: Option<String>,

    target_hz: u32,
}

impl PerformanceMonitor {
    pub fn new(target_hz: u32) -> Self {
        Self {
            frame_times: VecDeque::with_capacity(HISTORY),
            draw_counts: VecDeque::with_capacity(HISTORY),
            avg_frame_time_ms: 0.0,
            max_frame_time_ms: 0.0,
            cpu_bound_fps: 0.0,
            avg_draws: 0.0,
            total_frames: 0,
            total_draws: 0,
            open_menus: 0,
            focused: None,
            target_hz,
        }
    }

    pub fn add_frame(&mut self, frame_time_ms: f32, draws: usize) {
        self.frame_times.push_back(frame_time_ms);
        if self.frame_times.len() > HISTORY {
            self.frame_times.pop_front();
        }
        self.draw_counts.push_back(draws);
        if self.draw_counts.len() > HISTORY {
            self.draw_counts.pop_front();
        }
        self.total_frames += 1;
        self.total_draws += draws as u64;
    }

    pub fn update_gui_stats(&mut self, open_menus: usize, focused: Option<String>) {
        self.open_menus = open_menus;
        self.focused = focused;
    }

    /// Recompute the rolling averages
    pub fn update_stats(&mut self) {
        if !self.frame_times.is_empty() {
            self.avg_frame_time_ms = self.frame_times.iter().sum::<f32>() / self.frame_times.len() as f32;
            self.max_frame_time_ms = self.frame_times.iter().copied().fold(0.0, f32::max);
            self.cpu_bound_fps = 1000.0 / self.avg_frame_time_ms.max(0.001);
        }
        if !self.draw_counts.is_empty() {
            self.avg_draws = self.draw_counts.iter().sum::<usize>() as f32 / self.draw_counts.len() as f32;
        }
    }

    /// Share of the display frame budget the CPU side uses
    pub fn budget_used(&self) -> f32 {
        let budget_ms = 1000.0 / self.target_hz.max(1) as f32;
        self.avg_frame_time_ms / budget_ms
    }

    pub fn report(&self) {
        tracing::info!(
            frames = self.total_frames,
            avg_ms = self.avg_frame_time_ms,
            max_ms = self.max_frame_time_ms,
            budget = self.budget_used(),
            draws = self.avg_draws,
            menus = self.open_menus,
            focused = self.focused.as_deref().unwrap_or("-"),
            "frame stats"
        );
    }

    pub fn overlay_text(&self) -> String {
        format!(
            "FRAME\n\
            cpu: {:.2}ms avg, {:.2}ms max ({:.0} fps bound)\n\
            budget: {:.0}% of {} Hz\n\
            \n\
            GUI\n\
            draws: {:.1}/frame, {} total\n\
            open menus: {}\n\
            focus: {}\n\
            frames: {}",
            self.avg_frame_time_ms,
            self.max_frame_time_ms,
            self.cpu_bound_fps,
            self.budget_used() * 100.0,
            self.target_hz,
            self.avg_draws,
            self.total_draws,
            self.open_menus,
            self.focused.as_deref().unwrap_or("-"),
            self.total_frames,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rolling_window_drops_old_frames() {
        let mut m = PerformanceMonitor::new(72);
        m.add_frame(100.0, 1);
        for _ in 0..HISTORY {
            m.add_frame(2.0, 4);
        }
        m.update_stats();
        assert_eq!(m.avg_frame_time_ms, 2.0);
        assert_eq!(m.max_frame_time_ms, 2.0);
        assert_eq!(m.avg_draws, 4.0);
        assert_eq!(m.total_frames, HISTORY as u64 + 1);
        assert_eq!(m.total_draws, HISTORY as u64 * 4 + 1);
    }

    #[test]
    fn test_budget_and_overlay() {
        let mut m = PerformanceMonitor::new(100);
        m.add_frame(5.0, 3);
        m.update_stats();
        m.update_gui_stats(1, Some("seek_bar".to_string()));
        assert!((m.budget_used() - 0.5).abs() < 1e-6);
        let text = m.overlay_text();
        assert!(text.contains("budget: 50% of 100 Hz"));
        assert!(text.contains("focus: seek_bar"));
    }
}
