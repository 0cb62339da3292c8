//! System-instruction assembly for the remote agent
//!
//! The agent's behavior for a session is fixed by a system instruction
//! built from the candidate and job context, one variant per session kind.

use crate::session::config::{CandidateContext, SessionKind};

pub fn for_session(kind: SessionKind, ctx: &CandidateContext) -> String {
    match kind {
        SessionKind::Call => call_instruction(ctx),
        SessionKind::Interview => interview_instruction(ctx),
    }
}

/// Instruction for a scheduling call: greet, offer slots, confirm one.
fn call_instruction(ctx: &CandidateContext) -> String {
    format!(
        "You are a friendly and professional AI hiring assistant calling {name} to schedule a technical interview.\n\
         \n\
         Job Details:\n\
         - Position: {title}\n\
         - Department: {department}{resume}\n\
         \n\
         Your task:\n\
         1. Greet the candidate and confirm you are speaking with {name}\n\
         2. Ask if it's a good time to talk\n\
         3. Explain you are calling about their application for the {title} position and would like to schedule a technical interview\n\
         4. Offer three specific interview slots: Monday at 10 AM, Wednesday at 2 PM, Friday at 4 PM\n\
         5. Wait for the candidate to confirm one slot\n\
         6. Once confirmed, repeat the slot back and thank them\n\
         7. End the call politely\n\
         \n\
         Keep responses concise and natural. If the candidate has questions about the role, answer briefly from the context provided.",
        name = ctx.candidate_name,
        title = ctx.job_title,
        department = ctx.department,
        resume = resume_block(ctx),
    )
}

/// Instruction for a technical screening interview.
fn interview_instruction(ctx: &CandidateContext) -> String {
    format!(
        "You are Alex, an expert AI technical interviewer conducting a screening interview with {name} for the {title} position.\n\
         \n\
         Job Description:\n\
         {description}\n\
         \n\
         Candidate Background:\n\
         {resume}\n\
         \n\
         Your task:\n\
         1. Greet {name} warmly and introduce yourself\n\
         2. Mention you've reviewed their resume\n\
         3. Ask 3-4 technical questions relevant to the job and their background\n\
         4. Wait for complete answers before responding; allow a moment of silence after they stop speaking\n\
         5. Be encouraging and professional\n\
         6. End by thanking them and explaining next steps\n\
         \n\
         Keep the interview conversational and natural. Begin now.",
        name = ctx.candidate_name,
        title = ctx.job_title,
        description = ctx.job_description,
        resume = ctx
            .resume_highlights
            .as_deref()
            .unwrap_or("No resume analysis available"),
    )
}

fn resume_block(ctx: &CandidateContext) -> String {
    match &ctx.resume_highlights {
        Some(highlights) => format!("\n\nCandidate Background:\n{highlights}"),
        None => String::new(),
    }
}
