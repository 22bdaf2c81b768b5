//! Keyword-based icon suggestion for task titles.

/// Icon used when no keyword matches.
pub const DEFAULT_ICON: &str = "📝";

/// Ordered (keywords, icon) rules. The first rule with any keyword contained in the
/// lowercased title wins, so earlier rows take priority over later ones.
const RULES: &[(&[&str], &str)] = &[
    // Development & tech
    (&["bug", "fix", "error", "crash", "issue", "debug"], "🐛"),
    (&["code", "develop", "program", "implement", "build", "refactor"], "💻"),
    (&["deploy", "release", "launch", "ship", "publish"], "🚀"),
    (&["test", "qa", "quality", "testing"], "🧪"),
    (&["api", "endpoint", "integration", "webhook"], "🔌"),
    (&["database", "data", "sql", "query", "schema"], "🗄️"),
    (&["server", "backend", "infrastructure"], "🖥️"),
    (&["frontend", "ui", "interface"], "🌐"),
    (&["mobile", "app", "ios", "android"], "📱"),
    (&["performance", "optimize", "speed"], "⚡"),
    (&["security", "password", "auth", "encryption"], "🔒"),
    (&["backup", "save", "archive", "export"], "💾"),
    // Design & creative
    (&["design", "ui", "ux", "mockup", "prototype"], "🎨"),
    (&["logo", "brand", "identity"], "🎭"),
    (&["photo", "image", "picture"], "📸"),
    (&["video", "film", "record"], "🎬"),
    (&["music", "audio", "sound"], "🎵"),
    // Communication
    (&["meeting", "call", "zoom", "conference", "standup"], "📞"),
    (&["email", "message", "reply", "respond", "inbox"], "📧"),
    (&["chat", "slack", "discord", "teams"], "💬"),
    (&["present", "demo", "show", "pitch"], "📊"),
    (&["interview", "recruit", "hire"], "🎤"),
    (&["feedback", "survey", "review"], "📝"),
    // Documentation & content
    (&["document", "report", "write", "draft", "doc"], "📄"),
    (&["blog", "article", "content", "post"], "✍️"),
    (&["note", "memo", "minutes"], "📋"),
    (&["contract", "agreement", "legal"], "📜"),
    // Planning & management
    (&["plan", "strategy", "roadmap", "planning"], "🗺️"),
    (&["goal", "target", "objective", "okr"], "🎯"),
    (&["schedule", "calendar", "appointment"], "📅"),
    (&["deadline", "due", "time"], "⏰"),
    (&["todo", "task", "checklist"], "✅"),
    (&["prioritize", "organize", "sort"], "📌"),
    // Business & finance
    (&["money", "budget", "finance", "pay", "payment", "invoice"], "💰"),
    (&["sales", "revenue", "profit"], "💵"),
    (&["analytics", "metrics", "stats", "kpi", "dashboard"], "📈"),
    (&["client", "customer", "user", "account"], "👤"),
    (&["tax", "expense", "receipt"], "🧾"),
    // Team & collaboration
    (&["team", "collaborate", "group", "together"], "👥"),
    (&["delegate", "assign", "handoff"], "🤝"),
    (&["onboard", "train", "mentor"], "🎓"),
    // Learning & research
    (&["learn", "study", "research", "read", "course"], "📚"),
    (&["workshop", "training", "seminar"], "🎓"),
    (&["experiment", "try", "explore"], "🔬"),
    // Personal & wellness
    (&["health", "exercise", "workout", "gym", "fitness"], "💪"),
    (&["doctor", "medical", "appointment", "checkup"], "🏥"),
    (&["eat", "lunch", "dinner", "meal", "food", "breakfast"], "🍽️"),
    (&["sleep", "rest", "relax"], "😴"),
    (&["meditate", "mindful", "zen"], "🧘"),
    (&["water", "hydrate", "drink"], "💧"),
    // Shopping & errands
    (&["shop", "buy", "purchase", "order", "amazon"], "🛒"),
    (&["grocery", "groceries", "supermarket"], "🥕"),
    (&["gift", "present", "birthday"], "🎁"),
    (&["return", "exchange", "refund"], "↩️"),
    // Home & lifestyle
    (&["clean", "organize", "tidy", "declutter"], "🧹"),
    (&["laundry", "wash", "clothes"], "🧺"),
    (&["cook", "recipe", "kitchen"], "👨‍🍳"),
    (&["garden", "plant", "grow"], "🌱"),
    (&["pet", "dog", "cat", "vet"], "🐾"),
    (&["car", "vehicle", "drive", "maintenance"], "🚗"),
    // Travel & events
    (&["travel", "trip", "vacation", "holiday"], "✈️"),
    (&["flight", "plane", "airport"], "🛫"),
    (&["hotel", "booking", "reservation"], "🏨"),
    (&["event", "conference", "summit"], "🎪"),
    // Urgent & important
    (&["urgent", "critical", "emergency", "asap", "important"], "🚨"),
    (&["fire", "crisis", "alert"], "🔥"),
    (&["warning", "caution", "attention"], "⚠️"),
    // Positive & achievement
    (&["celebrate", "party", "success", "win", "achievement"], "🎉"),
    (&["complete", "done", "finish", "accomplish"], "✨"),
    (&["launch", "premiere", "debut"], "🎊"),
    (&["milestone", "achievement", "badge"], "🏆"),
    // Miscellaneous
    (&["idea", "brainstorm", "creative", "innovation"], "💡"),
    (&["question", "help", "support"], "❓"),
    (&["phone", "mobile", "call"], "☎️"),
    (&["print", "printer", "copy"], "🖨️"),
    (&["scan", "scanner"], "📠"),
    (&["book", "library", "novel"], "📖"),
    (&["news", "article", "update"], "📰"),
    (&["weather", "forecast", "climate"], "🌤️"),
    (&["repair", "maintenance", "service"], "🔧"),
    (&["renew", "renewal", "subscription"], "🔄"),
];

/// Suggest an icon for a task title.
pub fn auto_icon(title: &str) -> &'static str {
    let lower = title.to_lowercase();
    RULES
        .iter()
        .find(|(keywords, _)| keywords.iter().any(|k| lower.contains(k)))
        .map(|(_, icon)| *icon)
        .unwrap_or(DEFAULT_ICON)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn matches_by_keyword() {
        assert_eq!(auto_icon("Fix the bug"), "🐛");
        assert_eq!(auto_icon("Debug the issue"), "🐛");
        assert_eq!(auto_icon("Deploy to production"), "🚀");
        assert_eq!(auto_icon("Reply to email"), "📧");
        assert_eq!(auto_icon("Check inbox"), "📧");
        assert_eq!(auto_icon("Team meeting"), "📞");
        assert_eq!(auto_icon("Standup"), "📞");
    }

    #[test]
    fn first_rule_wins() {
        // "fix" (bug rule) appears before "deploy" in the table.
        assert_eq!(auto_icon("Deploy the fix"), "🐛");
    }

    #[test]
    fn is_case_insensitive() {
        assert_eq!(auto_icon("FIX THE BUG"), "🐛");
        assert_eq!(auto_icon("Deploy to PRODUCTION"), "🚀");
    }

    #[test]
    fn falls_back_to_default() {
        assert_eq!(auto_icon("xyz unknown xyz"), DEFAULT_ICON);
        assert_eq!(auto_icon(""), DEFAULT_ICON);
    }
}
