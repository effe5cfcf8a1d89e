//! Word-level polarity scoring for financial headlines

/// Polarity of sentiment-bearing words, in [-1, 1]
const POLARITY: &[(&str, f64)] = &[
    // positive
    ("beat", 0.6),
    ("beats", 0.6),
    ("best", 1.0),
    ("boom", 0.6),
    ("boost", 0.5),
    ("boosts", 0.5),
    ("breakthrough", 0.7),
    ("bullish", 0.7),
    ("buy", 0.3),
    ("climb", 0.4),
    ("climbs", 0.4),
    ("confident", 0.5),
    ("excellent", 1.0),
    ("expand", 0.3),
    ("expands", 0.3),
    ("gain", 0.4),
    ("gains", 0.4),
    ("good", 0.7),
    ("great", 0.8),
    ("growth", 0.4),
    ("high", 0.16),
    ("higher", 0.25),
    ("improve", 0.5),
    ("improved", 0.5),
    ("improves", 0.5),
    ("jump", 0.5),
    ("jumps", 0.5),
    ("outperform", 0.6),
    ("outperforms", 0.6),
    ("positive", 0.5),
    ("profit", 0.4),
    ("profitable", 0.5),
    ("rally", 0.6),
    ("rallies", 0.6),
    ("record", 0.3),
    ("rebound", 0.4),
    ("rise", 0.4),
    ("rises", 0.4),
    ("soar", 0.7),
    ("soars", 0.7),
    ("strong", 0.5),
    ("stronger", 0.5),
    ("success", 0.6),
    ("successful", 0.7),
    ("surge", 0.6),
    ("surges", 0.6),
    ("top", 0.5),
    ("upgrade", 0.6),
    ("upgraded", 0.6),
    ("upgrades", 0.6),
    ("win", 0.8),
    ("wins", 0.8),
    // negative
    ("bad", -0.7),
    ("bankruptcy", -0.9),
    ("bearish", -0.7),
    ("crash", -0.8),
    ("crashes", -0.8),
    ("cut", -0.3),
    ("cuts", -0.3),
    ("decline", -0.4),
    ("declines", -0.4),
    ("downgrade", -0.6),
    ("downgraded", -0.6),
    ("downgrades", -0.6),
    ("drop", -0.4),
    ("drops", -0.4),
    ("fail", -0.5),
    ("fails", -0.5),
    ("fall", -0.4),
    ("falls", -0.4),
    ("fear", -0.5),
    ("fears", -0.5),
    ("fraud", -0.9),
    ("lawsuit", -0.5),
    ("lose", -0.5),
    ("loses", -0.5),
    ("loss", -0.5),
    ("losses", -0.5),
    ("low", -0.16),
    ("lower", -0.25),
    ("miss", -0.5),
    ("misses", -0.5),
    ("negative", -0.5),
    ("plunge", -0.8),
    ("plunges", -0.8),
    ("poor", -0.6),
    ("recall", -0.4),
    ("recession", -0.6),
    ("risk", -0.2),
    ("risky", -0.5),
    ("sell", -0.3),
    ("selloff", -0.6),
    ("slump", -0.6),
    ("slumps", -0.6),
    ("tumble", -0.6),
    ("tumbles", -0.6),
    ("underperform", -0.6),
    ("warning", -0.4),
    ("weak", -0.5),
    ("weaker", -0.5),
    ("worst", -1.0),
];

/// Words scaling the polarity of the word that follows
const INTENSIFIERS: &[(&str, f64)] = &[
    ("very", 1.3),
    ("extremely", 1.5),
    ("highly", 1.3),
    ("really", 1.2),
    ("sharply", 1.4),
    ("significantly", 1.3),
    ("slightly", 0.5),
    ("somewhat", 0.7),
];

const NEGATIONS: &[&str] = &["not", "no", "never", "neither", "nor", "without", "isn't", "don't", "doesn't", "didn't", "won't", "can't"];

/// Negated words flip and lose half their strength
const NEGATION_FACTOR: f64 = -0.5;

fn lookup(table: &[(&str, f64)], word: &str) -> Option<f64> {
    table.iter().find(|(w, _)| *w == word).map(|&(_, v)| v)
}

fn tokenize(text: &str) -> Vec<String> {
    text.split(|c: char| !(c.is_alphanumeric() || c == '\''))
        .filter(|t| !t.is_empty())
        .map(str::to_lowercase)
        .collect()
}

/// Mean polarity of the sentiment-bearing words in `text`, 0.0 when none
pub fn polarity(text: &str) -> f64 {
    let tokens = tokenize(text);
    let mut scores = Vec::new();

    for (i, token) in tokens.iter().enumerate() {
        let Some(mut score) = lookup(POLARITY, token) else {
            continue;
        };

        let previous = i.checked_sub(1).map(|p| tokens[p].as_str());
        if let Some(factor) = previous.and_then(|p| lookup(INTENSIFIERS, p)) {
            score *= factor;
        }

        // A negation up to two words back applies ("not very good")
        let window = &tokens[i.saturating_sub(2)..i];
        if window.iter().any(|t| NEGATIONS.contains(&t.as_str())) {
            score *= NEGATION_FACTOR;
        }

        scores.push(score.clamp(-1.0, 1.0));
    }

    if scores.is_empty() {
        0.0
    } else {
        scores.iter().sum::<f64>() / scores.len() as f64
    }
}
