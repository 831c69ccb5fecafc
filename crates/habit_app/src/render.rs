use chrono::NaiveDate;
use habit_core::stats::{compute_stats, CategorySummary};
use habit_core::{Habit, HabitStats, Overview};

pub fn streak_text(current: u32, longest: u32) -> String {
    format!("🔥 {current}d (🏆 {longest}d)")
}

pub fn completion_text(stats: &HabitStats) -> String {
    if stats.is_completed {
        "✅ Goal achieved!".to_string()
    } else {
        format!("📅 {}/{} days", stats.completed_days, stats.target_days)
    }
}

pub fn habit_line(habit: &Habit, today: NaiveDate) -> String {
    let stats = compute_stats(habit);
    let mark = if habit.completed_today(today) { "x" } else { " " };
    format!(
        "[{mark}] {id}  {name}  ({category}, {repeat}, {time})  {streak}  {completion}  {progress}%",
        id = habit.id,
        name = habit.name,
        category = habit.category_or_default(),
        repeat = habit.repeat,
        time = habit.time_of_day,
        streak = streak_text(stats.current_streak, stats.longest_streak),
        completion = completion_text(&stats),
        progress = stats.progress_percentage,
    )
}

pub fn overview_lines(overview: &Overview) -> Vec<String> {
    vec![
        format!(
            "Today: {}/{} habits done ({}%)",
            overview.habits_completed_today, overview.total_habits, overview.completion_rate
        ),
        format!("Current best streak: {} days", overview.current_streak),
        format!("Longest streak ever: {} days", overview.best_streak),
        format!("Total completed days: {}", overview.total_completed_days),
    ]
}

pub fn category_line(summary: &CategorySummary) -> String {
    let noun = if summary.habits == 1 { "habit" } else { "habits" };
    format!(
        "{}: {} {} ({} done today)",
        summary.name, summary.habits, noun, summary.completed_today
    )
}
