//! TwiML generation for the voice leg: speak a prompt and gather the next
//! utterance, or speak a closing line and hang up.

const VOICE: &str = "Polly.Joanna";
const LANG: &str = "en-US";
const GATHER_TIMEOUT_SECS: u32 = 7;

/// Twilio cuts long <Say> verbs off awkwardly; keep prompts speakable.
const SPEAK_LIMIT: usize = 450;

/// Speak `text` inside a <Gather> so the caller's reply comes back as the
/// next webhook request.
pub fn gather_prompt(text: &str, action: &str) -> String {
    format!(
        "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\
         <Response>\
         <Gather input=\"speech\" language=\"{LANG}\" action=\"{action}\" \
         method=\"POST\" timeout=\"{GATHER_TIMEOUT_SECS}\" speechTimeout=\"auto\">\
         <Say voice=\"{VOICE}\" language=\"{LANG}\">{}</Say>\
         </Gather>\
         <Redirect method=\"POST\">{action}</Redirect>\
         </Response>",
        xml_escape(&clip(text)),
    )
}

/// Speak `text` and end the call.
pub fn say_and_hangup(text: &str) -> String {
    format!(
        "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\
         <Response>\
         <Say voice=\"{VOICE}\" language=\"{LANG}\">{}</Say>\
         <Hangup/>\
         </Response>",
        xml_escape(&clip(text)),
    )
}

/// Trim to the speakable limit, preferring a sentence boundary in the back
/// portion of the budget.
pub fn clip(text: &str) -> String {
    let trimmed = text.trim();
    if trimmed.chars().count() <= SPEAK_LIMIT {
        return trimmed.to_string();
    }
    let cut: String = trimmed.chars().take(SPEAK_LIMIT).collect();
    let floor = SPEAK_LIMIT * 6 / 10;
    for punct in ['.', '?', '!'] {
        if let Some(pos) = cut.rfind(punct) {
            if pos >= floor {
                return cut[..=pos].trim().to_string();
            }
        }
    }
    format!("{}…", cut.trim())
}

fn xml_escape(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&apos;")
}
