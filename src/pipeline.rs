//! Build the model-pipeline stack from resolved configuration
//!
//! Source repository -> build project -> pipeline, plus the image repository
//! the build pushes to and an optional failure/success notification chain.

use crate::config::PipelineConfig;
use declarative::{Reference, Resource, ResourceKind, Result, Stack, Value};

pub const IMAGE_REPOSITORY: &str = "ImageRepository";
pub const SOURCE_REPOSITORY: &str = "SourceRepository";
pub const BUILD_PROJECT: &str = "BuildProject";
pub const BUILD_SOURCE_ACCESS: &str = "BuildSourceAccessPolicy";
pub const PIPELINE: &str = "Pipeline";
pub const NOTIFICATION_TOPIC: &str = "NotificationTopic";
pub const NOTIFICATION_SUBSCRIPTION: &str = "NotificationSubscription";
pub const PIPELINE_STATE_RULE: &str = "PipelineStateRule";

const BUILD_IMAGE: &str = "aws/codebuild/amazonlinux2-x86_64-standard:3.0";
const COMPUTE_TYPE: &str = "BUILD_GENERAL1_SMALL";

const SOURCE_ACTIONS: [&str; 4] = [
    "codecommit:ListBranches",
    "codecommit:ListRepositories",
    "codecommit:BatchGetRepositories",
    "codecommit:GitPull",
];

/// Terminal pipeline states that trigger a notification
const NOTIFY_STATES: [&str; 3] = ["FAILED", "SUCCEEDED", "STOPPED"];

/// Declare every resource and export of the pipeline stack
pub fn build_stack(config: &PipelineConfig) -> Result<Stack> {
    let mut stack = Stack::new(&config.stack_name);

    stack.add_resource(Resource::new(
        IMAGE_REPOSITORY,
        ResourceKind::ImageRepository,
        [
            ("repository_name", Value::from(config.image_repository.as_str())),
            ("scan_on_push", Value::from(true)),
        ],
    )?)?;

    stack.add_resource(Resource::new(
        SOURCE_REPOSITORY,
        ResourceKind::SourceRepository,
        [
            ("repository_name", Value::from(config.source_repository.as_str())),
            ("description", Value::from("Model source repository")),
        ],
    )?)?;

    stack.add_resource(Resource::new(
        BUILD_PROJECT,
        ResourceKind::BuildProject,
        [
            ("project_name", Value::from(config.build_project.as_str())),
            ("description", Value::from("Builds and pushes the model image")),
            ("environment", build_environment(config)),
        ],
    )?)?;

    stack.add_resource(Resource::new(
        BUILD_SOURCE_ACCESS,
        ResourceKind::RolePolicy,
        [
            ("role", Value::reference(BUILD_PROJECT, "role_arn")),
            ("actions", Value::strings(SOURCE_ACTIONS)),
            (
                "resources",
                Value::List(vec![Value::reference(SOURCE_REPOSITORY, "arn")]),
            ),
        ],
    )?)?;

    stack.add_resource(Resource::new(
        PIPELINE,
        ResourceKind::Pipeline,
        [
            ("pipeline_name", Value::from(config.pipeline_name.as_str())),
            ("stages", pipeline_stages(config)),
        ],
    )?)?;

    if let Some(email) = &config.notification_email {
        add_notifications(&mut stack, email)?;
    }

    stack.add_output(
        "RepositoryCloneUrlHttp",
        "Source repository HTTP clone URL",
        Reference::new(SOURCE_REPOSITORY, "clone_url_http"),
    )?;
    stack.add_output(
        "RepositoryCloneUrlSsh",
        "Source repository SSH clone URL",
        Reference::new(SOURCE_REPOSITORY, "clone_url_ssh"),
    )?;
    stack.add_output(
        "ImageRepositoryUri",
        "Image repository URI",
        Reference::new(IMAGE_REPOSITORY, "repository_uri"),
    )?;

    log::debug!(
        "Declared stack '{}' with {} resources",
        stack.name(),
        stack.graph().len()
    );
    Ok(stack)
}

fn build_environment(config: &PipelineConfig) -> Value {
    let plaintext = |name: &str, value: Value| {
        Value::map([
            ("name", Value::from(name)),
            ("type", Value::from("PLAINTEXT")),
            ("value", value),
        ])
    };

    Value::map([
        ("compute_type", Value::from(COMPUTE_TYPE)),
        ("image", Value::from(BUILD_IMAGE)),
        ("privileged", Value::from(true)),
        (
            "variables",
            Value::List(vec![
                plaintext("AWS_ACCOUNT_ID", Value::from(config.account.as_str())),
                plaintext("AWS_DEFAULT_REGION", Value::from(config.region.as_str())),
                plaintext(
                    "IMAGE_REPOSITORY_URI",
                    Value::reference(IMAGE_REPOSITORY, "repository_uri"),
                ),
            ]),
        ),
    ])
}

fn pipeline_stages(config: &PipelineConfig) -> Value {
    let source = Value::map([
        ("name", Value::from("Source")),
        (
            "actions",
            Value::List(vec![Value::map([
                ("name", Value::from("Source-CodeCommit")),
                ("provider", Value::from("CodeCommit")),
                ("repository", Value::reference(SOURCE_REPOSITORY, "repository_name")),
                ("branch", Value::from(config.branch.as_str())),
                ("trigger", Value::from("POLL")),
                ("output", Value::from("SourceArtifact")),
            ])]),
        ),
    ]);

    let build = Value::map([
        ("name", Value::from("Build")),
        (
            "actions",
            Value::List(vec![Value::map([
                ("name", Value::from("Build")),
                ("provider", Value::from("CodeBuild")),
                ("project", Value::reference(BUILD_PROJECT, "project_name")),
                ("input", Value::from("SourceArtifact")),
                ("output", Value::from("BuildArtifact")),
            ])]),
        ),
    ]);

    Value::List(vec![source, build])
}

fn add_notifications(stack: &mut Stack, email: &str) -> Result<()> {
    stack.add_resource(Resource::new(
        NOTIFICATION_TOPIC,
        ResourceKind::Topic,
        [("display_name", Value::from("Pipeline notifications"))],
    )?)?;

    stack.add_resource(Resource::new(
        NOTIFICATION_SUBSCRIPTION,
        ResourceKind::Subscription,
        [
            ("topic", Value::reference(NOTIFICATION_TOPIC, "arn")),
            ("protocol", Value::from("email")),
            ("endpoint", Value::from(email)),
        ],
    )?)?;

    let pattern = Value::map([
        ("source", Value::strings(["aws.codepipeline"])),
        (
            "detail-type",
            Value::strings(["CodePipeline Pipeline Execution State Change"]),
        ),
        (
            "resources",
            Value::List(vec![Value::reference(PIPELINE, "arn")]),
        ),
        (
            "detail",
            Value::map([("state", Value::strings(NOTIFY_STATES))]),
        ),
    ]);

    stack.add_resource(Resource::new(
        PIPELINE_STATE_RULE,
        ResourceKind::EventRule,
        [
            ("description", Value::from("Notify on pipeline state changes")),
            ("event_pattern", pattern),
            (
                "targets",
                Value::List(vec![Value::map([(
                    "arn",
                    Value::reference(NOTIFICATION_TOPIC, "arn"),
                )])]),
            ),
        ],
    )?)?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::SimulatedProvider;
    use declarative::{ExecuteOptions, NoProgress, StackState};

    fn config_with_email() -> PipelineConfig {
        PipelineConfig {
            notification_email: Some("ops@example.com".to_string()),
            ..PipelineConfig::default()
        }
    }

    #[test]
    fn test_plan_order_without_notifications() {
        let mut stack = build_stack(&PipelineConfig::default()).unwrap();
        let plan = stack.plan().unwrap();
        assert_eq!(
            plan.names(),
            vec![
                IMAGE_REPOSITORY,
                SOURCE_REPOSITORY,
                BUILD_PROJECT,
                BUILD_SOURCE_ACCESS,
                PIPELINE
            ]
        );
    }

    #[test]
    fn test_notifications_only_with_email() {
        let stack = build_stack(&PipelineConfig::default()).unwrap();
        let subscriptions = stack
            .graph()
            .resources()
            .filter(|r| r.kind() == ResourceKind::Subscription)
            .count();
        assert_eq!(subscriptions, 0);
        assert!(stack.resource(PIPELINE_STATE_RULE).is_none());

        let stack = build_stack(&config_with_email()).unwrap();
        let subscriptions = stack
            .graph()
            .resources()
            .filter(|r| r.kind() == ResourceKind::Subscription)
            .count();
        assert_eq!(subscriptions, 1);
        assert_eq!(stack.graph().len(), 8);

        let subscription = stack.resource(NOTIFICATION_SUBSCRIPTION).unwrap();
        assert_eq!(
            subscription.attribute("topic"),
            Some(&Value::reference(NOTIFICATION_TOPIC, "arn"))
        );
        let rule = stack.resource(PIPELINE_STATE_RULE).unwrap();
        let states = rule
            .attribute("event_pattern")
            .and_then(|p| p.get("detail"))
            .and_then(|d| d.get("state"))
            .unwrap();
        assert_eq!(*states, Value::strings(["FAILED", "SUCCEEDED", "STOPPED"]));
    }

    #[test]
    fn test_dependencies() {
        let mut stack = build_stack(&config_with_email()).unwrap();
        stack.resolve_references().unwrap();
        let graph = stack.graph();

        assert_eq!(graph.dependencies(BUILD_PROJECT).unwrap(), vec![IMAGE_REPOSITORY]);
        let mut policy = graph.dependencies(BUILD_SOURCE_ACCESS).unwrap();
        policy.sort_unstable();
        assert_eq!(policy, vec![BUILD_PROJECT, SOURCE_REPOSITORY]);
        let mut rule = graph.dependencies(PIPELINE_STATE_RULE).unwrap();
        rule.sort_unstable();
        assert_eq!(rule, vec![NOTIFICATION_TOPIC, PIPELINE]);
    }

    #[test]
    fn test_plan_with_notifications_respects_references() {
        let mut stack = build_stack(&config_with_email()).unwrap();
        let plan = stack.plan().unwrap();
        let pos = |name: &str| plan.position(name).unwrap();

        assert!(pos(NOTIFICATION_TOPIC) < pos(NOTIFICATION_SUBSCRIPTION));
        assert!(pos(PIPELINE) < pos(PIPELINE_STATE_RULE));
        assert!(pos(NOTIFICATION_TOPIC) < pos(PIPELINE_STATE_RULE));
        assert!(pos(BUILD_PROJECT) < pos(PIPELINE));
    }

    #[test]
    fn test_apply_end_to_end() {
        let config = config_with_email();
        let mut stack = build_stack(&config).unwrap();
        let provider = SimulatedProvider::new(&config.region, &config.account);
        let summary = stack.apply(&provider).unwrap();

        assert_eq!(stack.state(), StackState::Applied);
        assert_eq!(summary.created, 8);

        let image_uri = stack.outputs(IMAGE_REPOSITORY).unwrap()["repository_uri"].clone();
        assert_eq!(
            image_uri.as_str(),
            Some("000000000000.dkr.ecr.us-east-1.amazonaws.com/model-image-repo")
        );

        let exports = stack.exports().unwrap();
        let names: Vec<&str> = exports.iter().map(|e| e.name.as_str()).collect();
        assert_eq!(
            names,
            vec![
                "RepositoryCloneUrlHttp",
                "RepositoryCloneUrlSsh",
                "ImageRepositoryUri"
            ]
        );
        assert_eq!(exports[2].value, image_uri);
        assert_eq!(
            exports[0].value.as_str(),
            Some("https://git-codecommit.us-east-1.amazonaws.com/v1/repos/model-repo")
        );
    }

    #[test]
    fn test_concurrent_apply_matches_sequential() {
        let config = config_with_email();
        let provider = SimulatedProvider::new(&config.region, &config.account);

        let mut sequential = build_stack(&config).unwrap();
        sequential.apply(&provider).unwrap();

        let mut concurrent = build_stack(&config).unwrap();
        concurrent
            .apply_with(&provider, &ExecuteOptions { jobs: 4 }, &mut NoProgress)
            .unwrap();

        for resource in sequential.graph().resources() {
            assert_eq!(
                sequential.outputs(resource.name()).unwrap(),
                concurrent.outputs(resource.name()).unwrap()
            );
        }
    }
}
