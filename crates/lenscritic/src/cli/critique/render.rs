//! Terminal rendering of a finished critique.

use console::Style;
use lenscritic_core::{CritiqueResult, CritiqueSettings};
use std::fmt::Write;

const BAR_WIDTH: usize = 20;

/// Styled multi-section report for stdout.
pub fn render(result: &CritiqueResult, settings: &CritiqueSettings) -> String {
    let bold = Style::new().bold();
    let dim = Style::new().dim();
    let heading = Style::new().cyan().bold();

    let mut out = String::new();
    let _ = writeln!(out);
    let _ = writeln!(out, "  {}", bold.apply_to(&result.title));
    let _ = writeln!(
        out,
        "  {}",
        dim.apply_to(format!(
            "{} · {} · {}",
            settings.provider, settings.model, settings.style
        ))
    );
    let _ = writeln!(out);

    let _ = writeln!(
        out,
        "  {:<12} {} {}",
        "overall",
        score_style(result.overall_score).apply_to(score_bar(result.overall_score)),
        bold.apply_to(format!("{:>3.0}", result.overall_score))
    );
    for (name, score) in result.sub_scores() {
        let _ = writeln!(
            out,
            "  {:<12} {} {:>3.0}",
            name,
            score_style(score).apply_to(score_bar(score)),
            score
        );
    }

    let _ = writeln!(out);
    let _ = writeln!(out, "  {}", result.summary);

    write_list(&mut out, &heading.apply_to("Strengths").to_string(), &result.strengths);
    write_list(&mut out, &heading.apply_to("Weaknesses").to_string(), &result.weaknesses);
    write_list(
        &mut out,
        &heading.apply_to("Improvements").to_string(),
        &result.improvements,
    );

    for (label, text) in [
        ("Technique", &result.technical_analysis),
        ("Composition", &result.composition_analysis),
    ] {
        if let Some(text) = text {
            let _ = writeln!(out);
            let _ = writeln!(out, "  {}", heading.apply_to(label));
            let _ = writeln!(out, "  {text}");
        }
    }
    let _ = writeln!(out);
    out
}

fn write_list(out: &mut String, heading: &str, items: &[String]) {
    if items.is_empty() {
        return;
    }
    let _ = writeln!(out);
    let _ = writeln!(out, "  {heading}");
    for item in items {
        let _ = writeln!(out, "    • {item}");
    }
}

/// Fixed-width bar, one cell per 5 points.
fn score_bar(score: f64) -> String {
    let filled = ((score.clamp(0.0, 100.0) / 100.0) * BAR_WIDTH as f64).round() as usize;
    format!("{}{}", "█".repeat(filled), "░".repeat(BAR_WIDTH - filled))
}

fn score_style(score: f64) -> Style {
    match score {
        s if s >= 80.0 => Style::new().green(),
        s if s >= 60.0 => Style::new().yellow(),
        _ => Style::new().red(),
    }
}
