use super::*;

#[test]
fn shortstat_parses_files_insertions_and_deletions() {
    let stat = parse_shortstat(" 3 files changed, 10 insertions(+), 4 deletions(-)");
    assert_eq!(
        stat,
        DiffStat {
            files_changed: 3,
            insertions: 10,
            deletions: 4,
        }
    );
}

#[test]
fn shortstat_tolerates_missing_sections() {
    let stat = parse_shortstat(" 1 file changed, 2 insertions(+)");
    assert_eq!(
        stat,
        DiffStat {
            files_changed: 1,
            insertions: 2,
            deletions: 0,
        }
    );
}

#[tokio::test]
async fn fake_adapter_returns_configured_values() {
    let adapter = fake::FakeVcsAdapter::new();
    let repo = Path::new("/tmp/project");
    adapter.set_head(repo, "abc123");
    adapter.set_diff_stat(
        repo,
        DiffStat {
            files_changed: 2,
            insertions: 5,
            deletions: 1,
        },
    );
    adapter.set_log(repo, vec!["abc123 fix thing".to_string()]);

    assert_eq!(adapter.head(repo).await.unwrap(), "abc123");
    assert_eq!(adapter.diff_stat(repo, "base").await.unwrap().insertions, 5);
    assert_eq!(adapter.log_oneline(repo, "base").await.unwrap().len(), 1);
}
