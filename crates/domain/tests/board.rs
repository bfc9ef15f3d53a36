use std::sync::Arc;

use promptboard_domain::admin::AdminService;
use promptboard_domain::error::DomainError;
use promptboard_domain::memory::{
    InMemoryBanRepository, InMemoryIpEventRepository, InMemoryPromptRepository,
    InMemoryVoteRepository,
};
use promptboard_domain::policy::{ContentPolicy, SubmissionLimits};
use promptboard_domain::prompts::{
    PromptCreate, PromptEdit, PromptListQuery, PromptService, PromptSort, TopRange,
};
use promptboard_domain::ranking::hot_score;
use promptboard_domain::scoring::ScoreMaintainer;
use promptboard_domain::votes::VoteService;

const HOUR_MS: i64 = 3_600_000;
const NOW: i64 = 1_760_000_000_000;

struct Board {
    prompts: PromptService,
    votes: VoteService,
    admin: AdminService,
}

fn board_with_limits(limits: SubmissionLimits) -> Board {
    let prompt_repo = Arc::new(InMemoryPromptRepository::new());
    let vote_repo = Arc::new(InMemoryVoteRepository::new());
    let ban_repo = Arc::new(InMemoryBanRepository::new());
    let event_repo = Arc::new(InMemoryIpEventRepository::new());
    let maintainer = ScoreMaintainer::new(prompt_repo.clone());
    Board {
        prompts: PromptService::new(
            prompt_repo.clone(),
            ban_repo.clone(),
            event_repo,
            ContentPolicy::from_csv("spam"),
            limits,
        ),
        votes: VoteService::new(
            prompt_repo.clone(),
            vote_repo.clone(),
            ban_repo.clone(),
            maintainer.clone(),
        ),
        admin: AdminService::new(prompt_repo, vote_repo, ban_repo, maintainer),
    }
}

fn board() -> Board {
    board_with_limits(SubmissionLimits::default())
}

fn create(title: &str) -> PromptCreate {
    PromptCreate {
        title: title.to_string(),
        prompt_text: format!("Prompt body for {title}"),
        name: "ada".to_string(),
        tag: Some("writing".to_string()),
        honeypot: None,
    }
}

fn hot_query() -> PromptListQuery {
    PromptListQuery {
        sort: PromptSort::Hot,
        ..PromptListQuery::default()
    }
}

#[tokio::test]
async fn submitted_prompt_starts_unvoted_with_zero_score() {
    let board = board();
    let prompt = board
        .prompts
        .submit("ip-author", create("first"), NOW)
        .await
        .expect("submit");
    assert_eq!(prompt.votes_count, 0);
    assert_eq!(prompt.score_cached, 0.0);
    assert_eq!(prompt.author_hashed_ip, "ip-author");
    assert!(!prompt.edit_token.is_empty());
    assert_eq!(board.prompts.get(&prompt.prompt_id).await.expect("get"), prompt);
}

#[tokio::test]
async fn honeypot_submissions_are_rejected() {
    let board = board();
    let mut input = create("bot");
    input.honeypot = Some("http://spam.example".to_string());
    let result = board.prompts.submit("ip-bot", input, NOW).await;
    assert!(matches!(result, Err(DomainError::Validation(_))));
}

#[tokio::test]
async fn submissions_are_rate_limited_per_address() {
    let board = board_with_limits(SubmissionLimits {
        max_per_window: 2,
        window_ms: HOUR_MS,
    });
    for index in 0..2 {
        board
            .prompts
            .submit("ip-busy", create(&format!("post {index}")), NOW)
            .await
            .expect("within limit");
    }
    let blocked = board.prompts.submit("ip-busy", create("third"), NOW).await;
    assert!(matches!(blocked, Err(DomainError::RateLimited(_))));

    board
        .prompts
        .submit("ip-other", create("other"), NOW)
        .await
        .expect("other address unaffected");
    board
        .prompts
        .submit("ip-busy", create("later"), NOW + HOUR_MS + 1)
        .await
        .expect("window elapsed");
}

#[tokio::test]
async fn edit_requires_matching_token() {
    let board = board();
    let prompt = board
        .prompts
        .submit("ip-author", create("draft"), NOW)
        .await
        .expect("submit");

    let forged = PromptEdit {
        edit_token: "not-the-token".to_string(),
        title: "hijacked".to_string(),
        prompt_text: "text".to_string(),
        name: "mallory".to_string(),
        tag: None,
    };
    let result = board.prompts.edit(&prompt.prompt_id, forged, NOW).await;
    assert!(matches!(result, Err(DomainError::Forbidden(_))));

    let edited = board
        .prompts
        .edit(
            &prompt.prompt_id,
            PromptEdit {
                edit_token: prompt.edit_token.clone(),
                title: "final".to_string(),
                prompt_text: "better text".to_string(),
                name: "ada".to_string(),
                tag: None,
            },
            NOW + HOUR_MS,
        )
        .await
        .expect("edit");
    assert_eq!(edited.title, "final");
    assert_eq!(edited.tag, None);
    assert_eq!(edited.updated_at_ms, NOW + HOUR_MS);
    assert_eq!(edited.created_at_ms, NOW);
}

#[tokio::test]
async fn one_upvote_per_address_and_score_follows_count() {
    let board = board();
    let prompt = board
        .prompts
        .submit("ip-author", create("popular"), NOW)
        .await
        .expect("submit");

    let receipt = board
        .votes
        .upvote(&prompt.prompt_id, "ip-1", NOW)
        .await
        .expect("vote");
    assert_eq!(receipt.votes_count, 1);
    assert_eq!(receipt.score, hot_score(1, NOW, NOW));

    let again = board.votes.upvote(&prompt.prompt_id, "ip-1", NOW).await;
    assert!(matches!(again, Err(DomainError::DuplicateVote)));

    let receipt = board
        .votes
        .upvote(&prompt.prompt_id, "ip-2", NOW + HOUR_MS)
        .await
        .expect("second vote");
    assert_eq!(receipt.votes_count, 2);
    assert_eq!(receipt.score, hot_score(2, NOW, NOW + HOUR_MS));
    assert!(board.votes.has_voted(&prompt.prompt_id, "ip-2").await.expect("has_voted"));
}

#[tokio::test]
async fn hot_listing_follows_cached_scores() {
    let board = board();
    let quiet = board
        .prompts
        .submit("ip-a", create("quiet"), NOW)
        .await
        .expect("submit");
    let loud = board
        .prompts
        .submit("ip-b", create("loud"), NOW - HOUR_MS)
        .await
        .expect("submit");
    for voter in ["v1", "v2", "v3"] {
        board
            .votes
            .upvote(&loud.prompt_id, voter, NOW)
            .await
            .expect("vote");
    }

    let listed = board.prompts.list(&hot_query(), NOW).await.expect("list");
    let ids: Vec<&str> = listed.iter().map(|p| p.prompt_id.as_str()).collect();
    assert_eq!(ids, [loud.prompt_id.as_str(), quiet.prompt_id.as_str()]);
}

#[tokio::test]
async fn top_range_excludes_older_prompts() {
    let board = board();
    let old = board
        .prompts
        .submit("ip-a", create("old"), NOW - 10 * 24 * HOUR_MS)
        .await
        .expect("submit");
    let recent = board
        .prompts
        .submit("ip-b", create("recent"), NOW - 2 * HOUR_MS)
        .await
        .expect("submit");
    board
        .votes
        .upvote(&old.prompt_id, "v1", NOW)
        .await
        .expect("vote");

    let week = PromptListQuery {
        sort: PromptSort::Top,
        range: TopRange::Week,
        ..PromptListQuery::default()
    };
    let listed = board.prompts.list(&week, NOW).await.expect("list");
    assert_eq!(listed.len(), 1);
    assert_eq!(listed[0].prompt_id, recent.prompt_id);

    let all = PromptListQuery {
        sort: PromptSort::Top,
        ..PromptListQuery::default()
    };
    let listed = board.prompts.list(&all, NOW).await.expect("list");
    assert_eq!(listed[0].prompt_id, old.prompt_id);
}

#[tokio::test]
async fn banned_addresses_cannot_post_or_vote() {
    let board = board();
    let prompt = board
        .prompts
        .submit("ip-author", create("target"), NOW)
        .await
        .expect("submit");
    board
        .admin
        .ban_ip("ip-troll", "brigading", NOW)
        .await
        .expect("ban");

    let post = board.prompts.submit("ip-troll", create("troll"), NOW).await;
    assert!(matches!(post, Err(DomainError::Forbidden(_))));
    let vote = board.votes.upvote(&prompt.prompt_id, "ip-troll", NOW).await;
    assert!(matches!(vote, Err(DomainError::Forbidden(_))));
    assert_eq!(board.admin.list_bans().await.expect("bans").len(), 1);
}

#[tokio::test]
async fn soft_deleted_prompts_vanish_from_public_views() {
    let board = board();
    let prompt = board
        .prompts
        .submit("ip-author", create("oops"), NOW)
        .await
        .expect("submit");
    board
        .admin
        .set_deleted(&prompt.prompt_id, true)
        .await
        .expect("delete");

    assert!(matches!(
        board.prompts.get(&prompt.prompt_id).await,
        Err(DomainError::NotFound)
    ));
    assert!(board.prompts.feed().await.expect("feed").is_empty());
    let vote = board.votes.upvote(&prompt.prompt_id, "ip-1", NOW).await;
    assert!(matches!(vote, Err(DomainError::NotFound)));

    let admin_view = board.admin.list_prompts(50, 0).await.expect("admin list");
    assert_eq!(admin_view.len(), 1);
    assert!(admin_view[0].is_deleted);

    board
        .admin
        .set_deleted(&prompt.prompt_id, false)
        .await
        .expect("restore");
    assert_eq!(board.prompts.feed().await.expect("feed").len(), 1);
}

#[tokio::test]
async fn wiping_votes_resets_count_score_and_vote_records() {
    let board = board();
    let prompt = board
        .prompts
        .submit("ip-author", create("gamed"), NOW - 3 * HOUR_MS)
        .await
        .expect("submit");
    for voter in ["v1", "v2"] {
        board
            .votes
            .upvote(&prompt.prompt_id, voter, NOW)
            .await
            .expect("vote");
    }

    let wipe = board
        .admin
        .wipe_votes(&prompt.prompt_id, NOW)
        .await
        .expect("wipe");
    assert_eq!(wipe.votes_removed, 2);
    assert_eq!(wipe.score.votes_count, 0);
    assert_eq!(wipe.score.score_cached, hot_score(0, NOW - 3 * HOUR_MS, NOW));

    let stored = board.prompts.get(&prompt.prompt_id).await.expect("get");
    assert_eq!(stored.votes_count, 0);
    assert_eq!(stored.score_cached, 0.0);

    let receipt = board
        .votes
        .upvote(&prompt.prompt_id, "v1", NOW)
        .await
        .expect("vote allowed again after wipe");
    assert_eq!(receipt.votes_count, 1);
}

#[tokio::test]
async fn wiping_unknown_prompt_is_not_found() {
    let board = board();
    let result = board.admin.wipe_votes("missing", NOW).await;
    assert!(matches!(result, Err(DomainError::NotFound)));
}

#[tokio::test]
async fn admin_sweep_reorders_hot_listing_as_posts_age() {
    let board = board();
    let veteran = board
        .prompts
        .submit("ip-a", create("veteran"), NOW - 200 * HOUR_MS)
        .await
        .expect("submit");
    for index in 0..6 {
        board
            .votes
            .upvote(&veteran.prompt_id, &format!("v{index}"), NOW - 199 * HOUR_MS)
            .await
            .expect("vote");
    }
    let rookie = board
        .prompts
        .submit("ip-b", create("rookie"), NOW - HOUR_MS)
        .await
        .expect("submit");
    board
        .votes
        .upvote(&rookie.prompt_id, "fan", NOW - HOUR_MS)
        .await
        .expect("vote");

    // Scores were cached when the veteran was young: it still leads.
    let before = board.prompts.list(&hot_query(), NOW).await.expect("list");
    assert_eq!(before[0].prompt_id, veteran.prompt_id);

    let report = board.admin.recompute_hot(NOW).await.expect("sweep");
    assert_eq!(report.scanned, 2);
    assert_eq!(report.updated, 2);
    assert_eq!(report.failed, 0);

    let after = board.prompts.list(&hot_query(), NOW).await.expect("list");
    assert_eq!(after[0].prompt_id, rookie.prompt_id);
}
