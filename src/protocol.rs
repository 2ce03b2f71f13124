//! Public protocol structs for WebSocket and HTTP endpoints (serde ready).
//! Keep this small and stable to evolve backend and frontend independently.

use serde::{Deserialize, Serialize};

use crate::domain::{Challenge, Feedback, FeedbackContract, Specialization, Tier};
use crate::progress::{rank_progress, LearnerProgress, RankProgress, RankThreshold, Skills};

/// Messages the client can send over WebSocket.
#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientWsMessage {
    Ping,
    SelectChallenge {
        #[serde(rename = "challengeId", default)]
        challenge_id: Option<String>,
    },
    SubmitAnswer {
        #[serde(rename = "challengeId")]
        challenge_id: String,
        answer: String,
    },
    Hint {
        #[serde(rename = "challengeId")]
        challenge_id: String,
        #[serde(default)]
        code: String,
    },
    GetCurriculum,
    GetProgress,
    ResetProgress,
    ChoosePath {
        path: Specialization,
    },
}

/// Messages the server sends back over WebSocket.
#[derive(Debug, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerWsMessage {
    Pong,
    Challenge { challenge: ChallengeOut },
    AnswerResult(AnswerOut),
    Hint { text: String },
    Curriculum(CurriculumOut),
    Progress(ProgressOut),
    CurriculumComplete,
    Error { message: String },
}

/// DTO used by both WS and HTTP for challenge delivery. The reference
/// solution and pitfalls never leave the server.
#[derive(Debug, Clone, Serialize)]
pub struct ChallengeOut {
    pub id: String,
    pub tier: Tier,
    pub path: Specialization,
    pub title: String,
    pub description: String,
    pub points: u32,
    pub initial_code: String,
    pub concepts: Vec<String>,
    /// 1-based position in the curriculum ("lesson N of M").
    pub position: usize,
    pub total: usize,
    pub completed: bool,
    pub ai_judged: bool,
}

pub fn to_out(c: &Challenge, curriculum: &[Challenge], progress: &LearnerProgress) -> ChallengeOut {
    ChallengeOut {
        id: c.id.clone(),
        tier: c.tier,
        path: c.path,
        title: c.title.clone(),
        description: c.description.clone(),
        points: c.points,
        initial_code: c.initial_code.clone(),
        concepts: c.concepts.clone(),
        position: curriculum.iter().position(|x| x.id == c.id).map_or(0, |i| i + 1),
        total: curriculum.len(),
        completed: progress.is_completed(&c.id),
        ai_judged: matches!(c.feedback, FeedbackContract::Remote),
    }
}

#[derive(Debug, Serialize)]
pub struct TierGroupOut {
    pub tier: Tier,
    pub challenges: Vec<ChallengeOut>,
}

#[derive(Debug, Serialize)]
pub struct CurriculumOut {
    pub tiers: Vec<TierGroupOut>,
    pub completed: usize,
    pub total: usize,
}

pub fn curriculum_out(curriculum: &[Challenge], progress: &LearnerProgress) -> CurriculumOut {
    let tiers = Tier::ALL
        .into_iter()
        .map(|tier| TierGroupOut {
            tier,
            challenges: curriculum.iter().filter(|c| c.tier == tier).map(|c| to_out(c, curriculum, progress)).collect(),
        })
        .filter(|g| !g.challenges.is_empty())
        .collect();
    CurriculumOut {
        tiers,
        completed: curriculum.iter().filter(|c| progress.is_completed(&c.id)).count(),
        total: curriculum.len(),
    }
}

/// Learner view with level and rank re-derived from xp on every read.
#[derive(Debug, Clone, Serialize)]
pub struct ProgressOut {
    pub xp: u64,
    pub level: u64,
    #[serde(flatten)]
    pub rank: RankProgress,
    pub streak: u32,
    pub completed_ids: Vec<String>,
    pub chosen_path: Specialization,
    pub skills: Skills,
}

pub fn progress_out(p: &LearnerProgress, ranks: &[RankThreshold], xp_per_level: u64) -> ProgressOut {
    ProgressOut {
        xp: p.xp,
        level: crate::progress::level_for_xp(p.xp, xp_per_level),
        rank: rank_progress(p.xp, ranks),
        streak: p.streak,
        completed_ids: p.completed_ids.iter().cloned().collect(),
        chosen_path: p.chosen_path,
        skills: p.skills.clone(),
    }
}

//
// HTTP request/response DTOs
//

#[derive(Debug, Deserialize)]
pub struct ChallengeQuery {
    pub id: Option<String>,
}

#[derive(Deserialize)]
pub struct AnswerIn {
    #[serde(rename = "challengeId")]
    pub challenge_id: String,
    pub answer: String,
}

#[derive(Debug, Serialize)]
pub struct AnswerOut {
    pub feedback: Feedback,
    pub progress: ProgressOut,
    /// True only when this submission earned XP (first-time correct).
    pub awarded: bool,
    /// Where the pending auto-advance will land; `None` at the end of the curriculum.
    pub next_challenge_id: Option<String>,
    pub advance_in_ms: Option<u64>,
}

#[derive(Deserialize)]
pub struct HintIn {
    #[serde(rename = "challengeId")]
    pub challenge_id: String,
    #[serde(default)]
    pub code: String,
}
#[derive(Serialize)]
pub struct HintOut {
    pub text: String,
}

#[derive(Deserialize)]
pub struct PathIn {
    pub path: Specialization,
}

#[derive(Serialize)]
pub struct HealthOut {
    pub ok: bool,
    pub ai_enabled: bool,
}

#[derive(Serialize)]
pub struct ErrorOut {
    pub message: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::seeds::{default_ranks, seed_curriculum};

    #[test]
    fn client_messages_parse() {
        let m: ClientWsMessage = serde_json::from_str(r#"{"type":"submit_answer","challengeId":"b1","answer":"x"}"#).unwrap();
        assert!(matches!(m, ClientWsMessage::SubmitAnswer { ref challenge_id, .. } if challenge_id == "b1"));
        let m: ClientWsMessage = serde_json::from_str(r#"{"type":"select_challenge"}"#).unwrap();
        assert!(matches!(m, ClientWsMessage::SelectChallenge { challenge_id: None }));
        let m: ClientWsMessage = serde_json::from_str(r#"{"type":"choose_path","path":"Data Wizard"}"#).unwrap();
        assert!(matches!(m, ClientWsMessage::ChoosePath { path: Specialization::DataWizard }));
    }

    #[test]
    fn curriculum_groups_by_tier_in_order() {
        let all = seed_curriculum();
        let mut p = LearnerProgress::default();
        p.completed_ids.insert("b2".into());
        let out = curriculum_out(&all, &p);
        assert_eq!(out.tiers.len(), 3);
        assert_eq!(out.tiers[0].challenges.iter().map(|c| c.id.as_str()).collect::<Vec<_>>(), ["b1", "b2", "b6"]);
        assert!(out.tiers[0].challenges[1].completed);
        assert_eq!(out.tiers[2].challenges[0].position, 7);
        assert_eq!((out.completed, out.total), (1, 8));
    }

    #[test]
    fn progress_view_flattens_rank_and_rederives_level() {
        let p = LearnerProgress { xp: 700, level: 1, ..Default::default() };
        let v = serde_json::to_value(progress_out(&p, &default_ranks(), 500)).unwrap();
        assert_eq!(v["level"], 2);
        assert_eq!(v["rank"], "Logic Explorer");
        assert_eq!(v["next_rank"], "Python Friend");
        assert_eq!(v["skills"]["async"], 0.0);
    }

    #[test]
    fn server_messages_are_tagged() {
        let v = serde_json::to_value(ServerWsMessage::Hint { text: "h".into() }).unwrap();
        assert_eq!(v["type"], "hint");
        let v = serde_json::to_value(ServerWsMessage::CurriculumComplete).unwrap();
        assert_eq!(v["type"], "curriculum_complete");
    }
}
