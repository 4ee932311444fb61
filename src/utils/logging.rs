/// 日志工具模块
///
/// 提供日志初始化、格式化和输出的辅助函数
use anyhow::Result;
use std::fs;
use tracing::info;
use tracing_subscriber::EnvFilter;

/// 初始化 tracing 日志
///
/// 默认级别 info，可通过 `RUST_LOG` 覆盖。重复调用不会报错。
pub fn init() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .try_init();
}

/// 初始化日志文件
///
/// # 参数
/// - `log_file_path`: 日志文件路径
pub fn init_log_file(log_file_path: &str) -> Result<()> {
    let log_header = format!(
        "{}\nCrossref 存缴日志 - {}\n{}\n\n",
        "=".repeat(60),
        chrono::Local::now().format("%Y-%m-%d %H:%M:%S"),
        "=".repeat(60)
    );
    fs::write(log_file_path, log_header)?;
    Ok(())
}

/// 记录程序启动信息
///
/// # 参数
/// - `mode`: 导出模式描述
/// - `sandbox`: 是否沙盒模式
pub fn log_startup(mode: &str, sandbox: bool) {
    info!("{}", "=".repeat(60));
    info!("🚀 程序启动 - Crossref 专著元数据{}", mode);
    if sandbox {
        info!("🧪 沙盒模式：不会与 Crossref 发生任何交互");
    }
    info!("{}", "=".repeat(60));
}

/// 记录投稿加载信息
///
/// # 参数
/// - `total`: 投稿总数
pub fn log_submissions_loaded(total: usize) {
    info!("✓ 找到 {} 个待处理的投稿", total);
    info!("📋 逐个处理，一个完成后再开始下一个\n");
}

/// 记录单个投稿开始处理
///
/// # 参数
/// - `index`: 当前序号（从 1 开始）
/// - `total`: 投稿总数
/// - `submission_id`: 投稿 ID
/// - `chapter_count`: 章节数
pub fn log_submission_start(index: usize, total: usize, submission_id: i64, chapter_count: usize) {
    info!("\n{}", "─".repeat(60));
    info!(
        "[提交 {}] 📦 开始处理第 {}/{} 个投稿，章节数: {}",
        submission_id, index, total, chapter_count
    );
}

/// 打印最终统计信息
///
/// # 参数
/// - `registered`: 注册成功数量
/// - `failed`: 失败数量
/// - `skipped`: 跳过数量（沙盒）
/// - `total`: 总数
pub fn print_final_stats(registered: usize, failed: usize, skipped: usize, total: usize) {
    info!("\n{}", "=".repeat(60));
    info!("📊 全部处理完成统计");
    info!(
        "完成时间: {}",
        chrono::Local::now().format("%Y-%m-%d %H:%M:%S")
    );
    info!("{}", "=".repeat(60));
    info!("✅ 注册成功: {}/{}", registered, total);
    info!("❌ 失败: {}", failed);
    if skipped > 0 {
        info!("⏭️ 跳过: {}", skipped);
    }
    info!("{}", "=".repeat(60));
}

/// 截断长文本用于日志显示
///
/// # 参数
/// - `text`: 原始文本
/// - `max_len`: 最大长度
///
/// # 返回
/// 返回截断后的文本
pub fn truncate_text(text: &str, max_len: usize) -> String {
    if text.chars().count() > max_len {
        text.chars().take(max_len).collect::<String>() + "..."
    } else {
        text.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truncate_text() {
        assert_eq!(truncate_text("abcdef", 3), "abc...");
        assert_eq!(truncate_text("abc", 3), "abc");
        assert_eq!(truncate_text("出版社名称", 2), "出版...");
    }
}
