use folio_core::domain::strategy::{Strategy, TradeIdea};
use folio_core::resolver::CurrentStrategy;
use std::fmt::Write;

pub fn render_current(current: &CurrentStrategy) -> String {
    let mut out = String::new();
    for (idx, strategy) in current.strategies().iter().enumerate() {
        let marker = if idx == current.selected_index() { '*' } else { ' ' };
        let _ = writeln!(out, "{marker} [{idx}] {}", display_name(strategy));
    }
    out.push('\n');
    render_strategy(&mut out, current.selected());
    out
}

fn display_name(strategy: &Strategy) -> &str {
    if strategy.name.is_empty() {
        "(unnamed strategy)"
    } else {
        &strategy.name
    }
}

fn render_strategy(out: &mut String, strategy: &Strategy) {
    let _ = writeln!(out, "{}", display_name(strategy));
    if !strategy.commentary.is_empty() {
        let _ = writeln!(out, "{}", strategy.commentary);
    }
    if !strategy.sectors.is_empty() {
        let _ = writeln!(out, "Sectors: {}", strategy.sectors.join(", "));
    }

    let swot = &strategy.swot;
    for (label, text) in [
        ("Strengths", &swot.strengths),
        ("Weaknesses", &swot.weaknesses),
        ("Opportunities", &swot.opportunities),
        ("Threats", &swot.threats),
    ] {
        if !text.is_empty() {
            let _ = writeln!(out, "{label}: {text}");
        }
    }

    render_ideas(out, '↑', &strategy.recommendations.buy);
    render_ideas(out, '↓', &strategy.recommendations.sell);
}

fn render_ideas(out: &mut String, arrow: char, ideas: &[TradeIdea]) {
    for idea in ideas {
        if idea.reason.is_empty() {
            let _ = writeln!(out, "  {arrow} {}", idea.ticker);
        } else {
            let _ = writeln!(out, "  {arrow} {}: {}", idea.ticker, idea.reason);
        }
    }
}
