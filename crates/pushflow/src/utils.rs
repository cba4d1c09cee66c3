use colored::Colorize;
use pushflow_core::{ItemOutcome, RunReport, WorkItem};
use serde_json::json;
use std::io::Write;
use std::path::Path;

/// CI のマトリクス用 JSON: `{"include":[{"path":..,"name":..}]}`
pub fn matrix_json(items: &[WorkItem], watched_root: &str) -> serde_json::Value {
    let include: Vec<_> = items
        .iter()
        .map(|item| json!({ "path": item.path, "name": item.name(watched_root) }))
        .collect();
    json!({ "include": include })
}

/// key=value 形式の出力ファイルに検出結果を追記する
pub fn append_outputs(path: &Path, items: &[WorkItem]) -> anyhow::Result<()> {
    let paths: Vec<&str> = items.iter().map(|item| item.path.as_str()).collect();
    let mut file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .map_err(|e| anyhow::anyhow!("出力ファイルを開けません: {}: {}", path.display(), e))?;

    writeln!(file, "paths={}", serde_json::to_string(&paths)?)?;
    writeln!(file, "any_changed={}", !items.is_empty())?;
    tracing::debug!("Wrote outputs to {}", path.display());
    Ok(())
}

/// 実行結果のサマリーを表示
pub fn print_report(report: &RunReport) {
    println!();
    println!("{}", "実行結果:".bold());

    if report.items.is_empty() {
        println!("  {}", "(変更されたワークアイテムはありません)".dimmed());
        return;
    }

    for item in &report.items {
        match &item.outcome {
            ItemOutcome::Pushed { image, tags } => {
                println!(
                    "  {} {:<32} {} {}",
                    "✓".green(),
                    item.path,
                    image.cyan(),
                    tags.join(", ").dimmed()
                );
            }
            ItemOutcome::Planned { image, tags } => {
                println!(
                    "  {} {:<32} {} {} {}",
                    "○".yellow(),
                    item.path,
                    image.cyan(),
                    tags.join(", ").dimmed(),
                    "(dry-run)".yellow()
                );
            }
            ItemOutcome::Failed {
                stage,
                message,
                pushed_tags,
            } => {
                println!(
                    "  {} {:<32} {} {}",
                    "✗".red(),
                    item.path,
                    format!("[{}]", stage).red().bold(),
                    message
                );
                if !pushed_tags.is_empty() {
                    println!(
                        "    {} {}",
                        "プッシュ済みのタグ:".yellow(),
                        pushed_tags.join(", ")
                    );
                }
            }
        }
    }

    let failed = report.failures().count();
    let succeeded = report.successes().count();
    println!();
    if failed == 0 {
        println!("{}", format!("✓ {} 件すべて成功しました", succeeded).green().bold());
    } else {
        println!(
            "{}",
            format!("✗ {} 件成功 / {} 件失敗", succeeded, failed).red().bold()
        );
    }
}

/// レポートを JSON ファイルに書き出す
pub fn write_report(path: &Path, report: &RunReport) -> anyhow::Result<()> {
    std::fs::write(path, report.to_json()?)
        .map_err(|e| anyhow::anyhow!("レポートを書き込めません: {}: {}", path.display(), e))?;
    println!("  {} {}", "レポート:".dimmed(), path.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_matrix_json() {
        let items = vec![
            WorkItem::new("templated_tests/alpha"),
            WorkItem::new("templated_tests/beta"),
        ];
        let value = matrix_json(&items, "templated_tests");
        assert_eq!(
            value,
            json!({
                "include": [
                    { "path": "templated_tests/alpha", "name": "alpha" },
                    { "path": "templated_tests/beta", "name": "beta" },
                ]
            })
        );
    }

    #[test]
    fn test_matrix_json_empty() {
        assert_eq!(matrix_json(&[], "templated_tests"), json!({ "include": [] }));
    }

    #[test]
    fn test_append_outputs() {
        let temp_dir = tempfile::tempdir().unwrap();
        let path = temp_dir.path().join("output");
        std::fs::write(&path, "existing=1\n").unwrap();

        append_outputs(&path, &[WorkItem::new("templated_tests/alpha")]).unwrap();
        append_outputs(&path, &[]).unwrap();

        let content = std::fs::read_to_string(&path).unwrap();
        assert_eq!(
            content,
            "existing=1\n\
             paths=[\"templated_tests/alpha\"]\n\
             any_changed=true\n\
             paths=[]\n\
             any_changed=false\n"
        );
    }
}
