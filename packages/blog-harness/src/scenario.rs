//! Scenario definitions and the checks each one performs.

use std::path::PathBuf;

use blog_store::{Author, BlogPostPatch, NewBlogPost, Posts};

use crate::assertions::{
    expect_absent, expect_at_least, expect_count, expect_empty_body, expect_json_content_type,
    expect_matches_input, expect_patch_applied, expect_post, expect_post_list,
    expect_post_matches, expect_status, AssertionError, Operation,
};
use crate::client::PostsClient;
use crate::config::HarnessConfig;
use crate::context::TestContext;
use crate::error::HarnessError;
use crate::fixture::FixtureLoader;

/// What a scenario does once the store is seeded.
#[derive(Debug, Clone)]
pub enum Exercise {
    /// `GET /posts` returns every seeded post with the right shape
    ListAll,
    /// `GET /posts/{id}` on the first seeded post
    ReadOne,
    /// `POST /posts` stores exactly the submitted post
    Create(NewBlogPost),
    /// `PUT /posts/{id}` on the first seeded post changes only the patched fields
    Update(BlogPostPatch),
    /// `DELETE /posts/{id}` on the first seeded post removes it
    Delete,
    /// Seeding the same fixture repeatedly leaves the same record count
    ReseedIsStable { cycles: usize },
}

/// A named exercise over a fixture.
#[derive(Debug, Clone)]
pub struct Scenario {
    pub name: String,
    pub fixture: PathBuf,
    pub exercise: Exercise,
}

/// What a scenario body may touch.
pub struct ScenarioEnv<'a> {
    pub client: &'a PostsClient,
    /// Direct store view, independent of the HTTP layer
    pub posts: Posts<'a>,
    pub loader: &'a FixtureLoader,
}

impl Scenario {
    pub fn new(name: impl Into<String>, fixture: impl Into<PathBuf>, exercise: Exercise) -> Self {
        Self {
            name: name.into(),
            fixture: fixture.into(),
            exercise,
        }
    }

    /// Runs the exercise. The store is already seeded.
    pub async fn execute(
        &self,
        env: &ScenarioEnv<'_>,
        ctx: &mut TestContext,
    ) -> Result<(), HarnessError> {
        match &self.exercise {
            Exercise::ListAll => list_all(env, ctx).await,
            Exercise::ReadOne => read_one(env, ctx).await,
            Exercise::Create(input) => create(env, ctx, input).await,
            Exercise::Update(patch) => update(env, ctx, patch).await,
            Exercise::Delete => delete(env, ctx).await,
            Exercise::ReseedIsStable { cycles } => reseed(env, ctx, *cycles).await,
        }
    }
}

async fn list_all(env: &ScenarioEnv<'_>, ctx: &mut TestContext) -> Result<(), HarnessError> {
    ctx.record(env.client.list().await?);
    let response = ctx.last_response()?;
    expect_status(Operation::List, response)?;
    expect_json_content_type(response)?;

    let items = expect_post_list(response)?;
    let context = response.label();
    expect_at_least(&context, 1, items.len())?;
    expect_count(&context, ctx.seeded_count(), items.len())?;
    expect_count(&format!("{} vs store", context), env.posts.count()?, items.len())?;

    for item in &items {
        let post = expect_post(&context, item)?;
        let stored = env.posts.find_by_id(&post.id)?;
        expect_post_matches(&context, &post, &stored)?;
    }
    Ok(())
}

async fn read_one(env: &ScenarioEnv<'_>, ctx: &mut TestContext) -> Result<(), HarnessError> {
    let target = ctx.first_seeded()?.id;
    ctx.record(env.client.get(&target).await?);
    let response = ctx.last_response()?;
    expect_status(Operation::Read, response)?;
    expect_json_content_type(response)?;

    let context = response.label();
    let post = expect_post(&context, &response.json_value()?)?;
    let stored = env.posts.find_by_id(&target)?;
    expect_post_matches(&context, &post, &stored)?;
    Ok(())
}

async fn create(
    env: &ScenarioEnv<'_>,
    ctx: &mut TestContext,
    input: &NewBlogPost,
) -> Result<(), HarnessError> {
    let before = env.posts.count()?;
    ctx.record(env.client.create(input).await?);
    let response = ctx.last_response()?;
    expect_status(Operation::Create, response)?;
    expect_json_content_type(response)?;

    let context = response.label();
    let post = expect_post(&context, &response.json_value()?)?;
    expect_matches_input(&context, &post, input)?;

    let location = format!("/posts/{}", post.id);
    match response.header("location") {
        Some(actual) if actual == location => {}
        actual => {
            return Err(AssertionError::Header {
                context,
                header: "location".to_string(),
                expected: location,
                actual: actual.unwrap_or("<none>").to_string(),
            }
            .into())
        }
    }

    let stored = env.posts.find_by_id(&post.id)?;
    expect_post_matches(&context, &post, &stored)?;
    expect_count(&context, before + 1, env.posts.count()?)?;
    ctx.capture("created", post.id);
    Ok(())
}

async fn update(
    env: &ScenarioEnv<'_>,
    ctx: &mut TestContext,
    patch: &BlogPostPatch,
) -> Result<(), HarnessError> {
    let target = ctx.first_seeded()?.id;
    let before = env.posts.find_by_id(&target)?;
    let count = env.posts.count()?;

    ctx.record(env.client.update(&target, patch).await?);
    let response = ctx.last_response()?;
    expect_status(Operation::Update, response)?;
    expect_empty_body(response)?;

    let context = response.label();
    let after = env.posts.find_by_id(&target)?;
    expect_patch_applied(&context, &before, &after, patch)?;
    expect_count(&context, count, env.posts.count()?)?;
    Ok(())
}

async fn delete(env: &ScenarioEnv<'_>, ctx: &mut TestContext) -> Result<(), HarnessError> {
    let target = ctx.first_seeded()?.id;
    let before = env.posts.count()?;

    ctx.record(env.client.remove(&target).await?);
    let response = ctx.last_response()?;
    expect_status(Operation::Delete, response)?;
    expect_empty_body(response)?;

    let context = response.label();
    expect_absent(&context, &target, env.posts.find_by_id(&target))?;
    expect_count(&context, before - 1, env.posts.count()?)?;

    // The API must agree with the store
    match env.client.get(&target).await {
        Err(e) if e.status().map(|s| s.as_u16()) == Some(404) => Ok(()),
        Err(e) => Err(e.into()),
        Ok(found) => Err(AssertionError::StillPresent {
            context: found.label(),
            id: target.to_hex(),
        }
        .into()),
    }
}

async fn reseed(
    env: &ScenarioEnv<'_>,
    ctx: &mut TestContext,
    cycles: usize,
) -> Result<(), HarnessError> {
    let expected = env.loader.fixture().len();
    for cycle in 1..=cycles {
        let seeded = env.loader.seed()?;
        let context = format!("reseed cycle {}", cycle);
        expect_count(&context, expected, seeded)?;

        ctx.record(env.client.list().await?);
        let items = expect_post_list(ctx.last_response()?)?;
        expect_count(&context, expected, items.len())?;
    }
    Ok(())
}

/// Post used by the create scenario and the single-post fixture.
pub fn sample_post() -> NewBlogPost {
    NewBlogPost::new(Author::new("Danny", "Di Giulio"), "I AM THE BEST", "hi")
}

/// The standard CRUD scenarios.
pub fn default_scenarios(config: &HarnessConfig) -> Vec<Scenario> {
    let seed = config.fixture_path(&config.default_fixture);
    vec![
        Scenario::new("list returns all seeded posts", &seed, Exercise::ListAll),
        Scenario::new("read returns one post", &seed, Exercise::ReadOne),
        Scenario::new(
            "create stores the submitted post",
            config.fixture_path("single-post.json"),
            Exercise::Create(sample_post()),
        ),
        Scenario::new(
            "update changes title and content",
            &seed,
            Exercise::Update(
                BlogPostPatch::default()
                    .title("Dr. DooLittle")
                    .content("a great book"),
            ),
        ),
        Scenario::new(
            "update changes author only",
            &seed,
            Exercise::Update(BlogPostPatch::default().author(Author::new("Hugh", "Lofting"))),
        ),
        Scenario::new("delete removes the post", &seed, Exercise::Delete),
        Scenario::new(
            "reseeding is idempotent",
            &seed,
            Exercise::ReseedIsStable { cycles: 3 },
        ),
    ]
}
