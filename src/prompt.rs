//! Builds the message sequence sent for one question.

use crate::llm::ChatMessage;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Language {
    Thai,
    English,
}

impl Language {
    pub fn as_str(&self) -> &'static str {
        match self {
            Language::Thai => "thai",
            Language::English => "english",
        }
    }
}

/// Thai if the question contains any character of the Thai block.
pub fn detect_language(question: &str) -> Language {
    if question.chars().any(|c| ('\u{0E00}'..='\u{0E7F}').contains(&c)) {
        Language::Thai
    } else {
        Language::English
    }
}

const THAI_SYSTEM_PROMPT: &str = "\
คุณคือผู้เชี่ยวชาญด้านการวิเคราะห์เอกสารประกวดราคาอิเล็กทรอนิกส์ (e-bidding) ของหน่วยงานภาครัฐไทย

**หน้าที่ของคุณ:**
1. ตอบคำถามของผู้เสนอราคาโดยใช้เฉพาะข้อมูลจากบริบทเอกสารที่แนบมาในคำถามเท่านั้น
2. ค้นหาข้อหรือข้อความในเอกสารที่ตรงกับคำถามมากที่สุด และยกข้อความภาษาไทยเดิมมาอ้างอิง
3. ระบุหมายเลขข้อหรือแหล่งที่มาให้ชัดเจนทุกครั้ง
4. หากคำตอบไม่อยู่ในบริบทที่ให้มา ให้ตอบว่า \"ไม่พบข้อมูลนี้ในเอกสารที่ให้มา\" และห้ามเดาหรือเพิ่มข้อมูลจากภายนอก

**รูปแบบคำตอบ:**
**คำถาม:** ...
**สรุปคำตอบ:** ... (เป็นข้อ ๆ)
**ข้อความจากเอกสาร:** ...
**แหล่งอ้างอิง:** [ข้อ X.Y]";

const ENGLISH_SYSTEM_PROMPT: &str = "\
You are an analyst of Thai government e-bidding documents.

**Your job:**
1. Answer the bidder's question using only the document context supplied with the question.
2. Find the clause or passage that matches the question best and quote it verbatim.
3. Always cite the clause number or source.
4. If the answer is not in the supplied context, reply \"This is not covered by the provided document.\" Do not guess or add outside information.

**Answer format:**
**Question:** ...
**Summary Answer:** ... (point form)
**Exact Sentence:** ...
**Source/Citation:** [Clause X.Y]";

pub fn system_prompt(lang: Language) -> &'static str {
    match lang {
        Language::Thai => THAI_SYSTEM_PROMPT,
        Language::English => ENGLISH_SYSTEM_PROMPT,
    }
}

/// The user turn actually sent: knowledge first, then the literal question.
/// Without knowledge the question goes out unchanged.
pub fn augment_question(knowledge: &str, question: &str) -> String {
    if knowledge.is_empty() {
        return question.to_string();
    }
    format!(
        "Use the following context to answer the question:\n\n{}\n\nQuestion: {}",
        knowledge, question
    )
}

/// `[system, ...history, user(augmented question)]`.
pub fn compose(history: &[ChatMessage], knowledge: &str, question: &str) -> Vec<ChatMessage> {
    let lang = detect_language(question);
    let mut messages = Vec::with_capacity(history.len() + 2);
    messages.push(ChatMessage::system(system_prompt(lang)));
    messages.extend_from_slice(history);
    messages.push(ChatMessage::user(augment_question(knowledge, question)));
    messages
}

/// Rough token count (four characters per token). Only used for logging.
pub fn estimate_tokens(text: &str) -> usize {
    text.chars().count() / 4
}

/// Starter questions offered by front-ends, as (Thai, English) pairs.
pub const SUGGESTED_QUESTIONS: [(&str, &str); 5] = [
    (
        "คุณสมบัติหลักของผู้ยื่นข้อเสนอ/ผู้เข้าร่วมประมูล มีอะไรบ้าง? (สรุป)",
        "What are the main qualifications of bidders/participants? (Summarized)",
    ),
    (
        "ผู้ยื่นข้อเสนอต้องแสดงหลักฐานทางการเงิน / หลักประกันการเสนอราคาเป็นจำนวนเท่าใด?",
        "How much financial proof / bid security must be provided?",
    ),
    (
        "หลักประกันการเสนอราคา / หลักฐานทางการเงินที่ยอมรับมีรูปแบบใดบ้าง?",
        "What forms of financial proof / bid security are accepted?",
    ),
    (
        "ผู้ยื่นข้อเสนอต้องมีผลงานหรือประสบการณ์ย้อนหลังกี่ปี?",
        "How many years of past work or experience are required?",
    ),
    (
        "การตัดสินผู้ชนะพิจารณาจากราคาต่ำสุดหรือเกณฑ์การให้คะแนน?",
        "Is the winner decided by lowest price or by scoring criteria?",
    ),
];
