use crate::model::{Deed, Quote};

/// Render the daily bilingual message. Line order and punctuation are fixed.
pub fn format_message(quote: &Quote, deed: &Deed, day_count: i64) -> String {
    [
        format!("🎋 竹筒歲月 Bamboo Bank — Day {day_count}"),
        String::new(),
        format!("「{}」", quote.text_zh),
        format!("\"{}\"", quote.text),
        format!(" — {}", quote.author),
        String::new(),
        "💡 今日善行 Today's good deed:".to_string(),
        format!("   {}", deed.text_zh),
        format!("   {}", deed.text),
        String::new(),
        "🪙 今天存下你的五毛錢。".to_string(),
        "   Save your 50 cents today.".to_string(),
        "   日行一善，聚沙成塔。".to_string(),
    ]
    .join("\n")
}
