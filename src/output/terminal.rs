// Colored terminal output for the channel, recent uploads, and analysis reports.
//
// Rendering only; main.rs decides what to show and when.

use colored::Colorize;

use super::{format_count, truncate_chars};
use crate::pipeline::{AnalysisReport, LabelSummary};
use crate::toxicity::ToxicityLabel;
use crate::youtube::types::{ChannelDetails, VideoSummary};

/// Width of the longest bar in the label table.
const BAR_WIDTH: usize = 30;

pub fn display_channel(channel: &ChannelDetails) {
    println!("\n{}", format!("=== {} ===", channel.title).bold());
    println!("  Channel id:  {}", channel.id.dimmed());
    if let Some(logo) = &channel.logo_url {
        println!("  Logo:        {}", logo.dimmed());
    }
    println!("  Subscribers: {}", format_count(channel.stats.subscribers));
    println!("  Views:       {}", format_count(channel.stats.views));
    println!("  Videos:      {}", format_count(channel.stats.videos));
    println!();
}

pub fn display_videos(videos: &[VideoSummary]) {
    println!(
        "\n{}",
        format!("=== Recent uploads ({}) ===", videos.len()).bold()
    );
    println!();

    for (i, video) in videos.iter().enumerate() {
        println!("  {}. {}", i + 1, video.title.bold());
        println!(
            "     {}  {} views  {} likes  {} comments",
            video.id.cyan(),
            format_count(video.views),
            format_count(video.likes),
            format_count(video.comments),
        );
        if !video.description.is_empty() {
            println!("     {}", video.description.dimmed());
        }
    }
    println!();
    println!(
        "{}",
        "Analyze one with: ytdetox analyze <VIDEO_ID>".dimmed()
    );
}

/// Summary table plus the flagged comments, if any.
pub fn display_report(report: &AnalysisReport) {
    if !report.has_comments {
        println!("Video {} has no comments yet.", report.video_id);
        return;
    }

    let summary = report.summary();
    display_summary(&report.video_id, &summary);

    if summary.toxic == 0 {
        println!("  {} No toxic comments found.", "ok".green().bold());
        return;
    }

    println!(
        "\n{}",
        format!("=== Flagged comments ({}) ===", summary.toxic).bold()
    );
    for (comment, prediction) in report.flagged() {
        let labels: Vec<&str> = prediction.flagged().map(|l| l.as_str()).collect();
        let preview = truncate_chars(&comment.text, 120);
        println!(
            "  {} [{}] {}",
            comment.id.dimmed(),
            labels.join(", ").red(),
            preview
        );
    }
    println!();
}

fn display_summary(video_id: &str, summary: &LabelSummary) {
    println!(
        "\n{}",
        format!("=== Toxicity for {video_id} ===").bold()
    );
    println!(
        "  {} comments analyzed, {} flagged",
        summary.total,
        colorize_toxic_count(summary.toxic)
    );
    println!();

    let max = summary.per_label.iter().copied().max().unwrap_or(0);
    for label in ToxicityLabel::ALL {
        let count = summary.count(label);
        let bar = "#".repeat(bar_len(count, max));
        println!(
            "  {:<14} {:>5}  {}",
            label.display_name(),
            count,
            colorize_bar(label, &bar)
        );
    }
    println!();
}

/// Bar length scaled so the largest count fills BAR_WIDTH. Any non-zero
/// count gets at least one mark.
fn bar_len(count: usize, max: usize) -> usize {
    if count == 0 || max == 0 {
        return 0;
    }
    (count * BAR_WIDTH / max).max(1)
}

fn colorize_toxic_count(n: usize) -> colored::ColoredString {
    if n == 0 {
        n.to_string().green()
    } else {
        n.to_string().red().bold()
    }
}

fn colorize_bar(label: ToxicityLabel, bar: &str) -> colored::ColoredString {
    match label {
        ToxicityLabel::SevereToxic | ToxicityLabel::Threat => bar.red().bold(),
        ToxicityLabel::Toxic | ToxicityLabel::IdentityHate => bar.bright_red(),
        ToxicityLabel::Obscene | ToxicityLabel::Insult => bar.yellow(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bar_len_scales_to_max() {
        assert_eq!(bar_len(10, 10), BAR_WIDTH);
        assert_eq!(bar_len(5, 10), BAR_WIDTH / 2);
        assert_eq!(bar_len(0, 10), 0);
        assert_eq!(bar_len(0, 0), 0);
    }

    #[test]
    fn test_bar_len_never_hides_small_counts() {
        assert_eq!(bar_len(1, 1000), 1);
    }
}
