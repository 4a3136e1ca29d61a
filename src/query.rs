//! # Query Interface
//! Read-only projections over the current snapshot, consumed by the chat
//! backend and the dashboard. Nothing here ever triggers a recomputation.

use crate::impact::InstitutionStats;
use crate::sentiment::SentimentLabel;
use crate::snapshot::Snapshot;

/// Top N institutions by impact score (the snapshot is already ranked).
pub fn top_n(snapshot: &Snapshot, n: usize) -> &[InstitutionStats] {
    &snapshot.institutions[..snapshot.institutions.len().min(n)]
}

/// Institutions carrying the given sentiment label, impact order preserved.
pub fn by_sentiment(snapshot: &Snapshot, label: SentimentLabel) -> Vec<&InstitutionStats> {
    snapshot
        .institutions
        .iter()
        .filter(|s| s.sentiment_label == label)
        .collect()
}

/// Institutions with at least `min` india linkage, strongest linkage first.
pub fn by_min_india_linkage(snapshot: &Snapshot, min: u32) -> Vec<&InstitutionStats> {
    let mut out: Vec<&InstitutionStats> = snapshot
        .institutions
        .iter()
        .filter(|s| s.india_linkage >= min)
        .collect();
    out.sort_by(|a, b| {
        b.india_linkage
            .cmp(&a.india_linkage)
            .then_with(|| a.institution.cmp(&b.institution))
    });
    out
}

/// One-line digest: totals plus the leading institution.
pub fn digest(snapshot: &Snapshot) -> String {
    match snapshot.institutions.first() {
        Some(top) => format!(
            "{} articles analyzed across {} institutions ({} positive, {} negative); {} leads with impact {:.1}",
            snapshot.total_articles,
            snapshot.total_institutions,
            snapshot.positive_count,
            snapshot.negative_count,
            top.institution,
            top.impact_score
        ),
        None => format!(
            "{} articles analyzed; no tracked institution was mentioned",
            snapshot.total_articles
        ),
    }
}

/// Compact context block handed to the generative chat backend.
pub fn chat_context(snapshot: &Snapshot) -> String {
    let mut out = String::new();
    out.push_str(&digest(snapshot));
    out.push('\n');
    for line in &snapshot.summary {
        out.push_str("- ");
        out.push_str(line);
        out.push('\n');
    }
    for s in top_n(snapshot, 5) {
        out.push_str(&format!(
            "{}: impact {:.1}, {} ({:+.3}), {} mentions, india linkage {}\n",
            s.institution,
            s.impact_score,
            label_str(s.sentiment_label),
            s.sentiment_value,
            s.mentions,
            s.india_linkage
        ));
    }
    out
}

/// Rule-based answer over the snapshot. Used directly when the generative
/// backend is disabled and as the graceful fallback when it errors.
pub fn answer(snapshot: &Snapshot, message: &str) -> String {
    let msg = message.to_lowercase();

    // Specific institution card first.
    for s in &snapshot.institutions {
        if msg.contains(&s.institution.to_lowercase()) {
            return institution_card(s);
        }
    }

    if msg.contains("top") || msg.contains("best") || msg.contains("highest") {
        let mut out = String::from("Top institutions by impact:\n");
        for (i, s) in top_n(snapshot, 3).iter().enumerate() {
            out.push_str(&format!(
                "{}. {} - score {:.1} ({})\n",
                i + 1,
                s.institution,
                s.impact_score,
                label_str(s.sentiment_label)
            ));
        }
        return out;
    }

    if msg.contains("positive") || msg.contains("bullish") {
        return list_by_label(snapshot, SentimentLabel::Positive, "Positive sentiment");
    }
    if msg.contains("negative") || msg.contains("bearish") {
        return list_by_label(snapshot, SentimentLabel::Negative, "Negative sentiment");
    }

    if msg.contains("india") {
        let linked = by_min_india_linkage(snapshot, 1);
        if linked.is_empty() {
            return "No institutions with strong India focus detected.".to_string();
        }
        let mut out = String::from("Institutions with India focus:\n");
        for s in linked.iter().take(5) {
            out.push_str(&format!(
                "- {} ({} India references)\n",
                s.institution, s.india_linkage
            ));
        }
        return out;
    }

    if msg.contains("summary") || msg.contains("overview") {
        let mut out = String::from("Market summary:\n");
        for line in &snapshot.summary {
            out.push_str(&format!("- {line}\n"));
        }
        return out;
    }

    "I can help with: specific institutions (\"Tell me about JPMorgan\"), \
     top performers, positive/negative sentiment, India focus, or a market summary."
        .to_string()
}

fn institution_card(s: &InstitutionStats) -> String {
    let drivers = if s.key_drivers.is_empty() {
        "No specific drivers identified".to_string()
    } else {
        s.key_drivers[..s.key_drivers.len().min(2)].join("; ")
    };
    format!(
        "{} analysis:\n\
         - Impact score: {:.1}\n\
         - Sentiment: {} ({:+.3})\n\
         - Mentions: {} articles\n\
         - India linkage: {} references\n\
         - Recent activity: {} articles in last 24h\n\
         Key drivers: {}",
        s.institution,
        s.impact_score,
        label_str(s.sentiment_label),
        s.sentiment_value,
        s.mentions,
        s.india_linkage,
        s.recent_articles,
        drivers
    )
}

fn list_by_label(snapshot: &Snapshot, label: SentimentLabel, heading: &str) -> String {
    let names: Vec<&str> = by_sentiment(snapshot, label)
        .iter()
        .take(5)
        .map(|s| s.institution.as_str())
        .collect();
    if names.is_empty() {
        format!("{heading}: none detected")
    } else {
        format!("{heading}: {}", names.join(", "))
    }
}

fn label_str(label: SentimentLabel) -> &'static str {
    match label {
        SentimentLabel::Positive => "Positive",
        SentimentLabel::Negative => "Negative",
        SentimentLabel::Mixed => "Mixed",
    }
}
