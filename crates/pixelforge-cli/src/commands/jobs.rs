//! Conversion job commands.

use super::Context;
use crate::output::{self, OutputFormat};
use anyhow::Result;
use pixelforge_jobs::{
    bytes_to_mb, image_extension, DirectorySaveTarget, Job, JobUpload, SaveTarget, UploadFile,
};
use std::path::Path;
use std::time::Duration;
use tracing::debug;

fn print_job(job: &Job) {
    output::print_row("ID", &job.id.to_string());
    output::print_row("File", &job.filename);
    output::print_row(
        "Conversion",
        &format!("{} -> {}", job.original_format, job.target_format),
    );
    output::print_row("Status", &job.status);
    if let Some(size) = job.input_size_bytes {
        output::print_row("Input size", &format!("{:.2} MB", bytes_to_mb(size)));
    }
    if let Some(size) = job.output_size_bytes {
        output::print_row("Output size", &format!("{:.2} MB", bytes_to_mb(size)));
    }
    output::print_row("Created", &job.created_at);
}

/// List supported target formats.
pub async fn formats(ctx: &Context) -> Result<()> {
    let formats = ctx.jobs.supported_target_formats().await?;

    match ctx.format {
        OutputFormat::Text => {
            if formats.is_empty() {
                println!("No target formats available");
            } else {
                for format in &formats {
                    println!("{}", format);
                }
            }
        }
        OutputFormat::Json => output::print_json(&formats)?,
    }

    Ok(())
}

/// List jobs, one page at a time.
pub async fn jobs_list(ctx: &Context, page: u32, size: u32) -> Result<()> {
    let jobs = ctx.jobs.list(page, size).await?;

    match ctx.format {
        OutputFormat::Text => {
            if jobs.results.is_empty() {
                println!("No jobs found");
                return Ok(());
            }

            println!(
                "{:<8} {:<30} {:<14} {:<12} {}",
                "ID", "File", "Conversion", "Status", "Created"
            );
            println!("{}", "-".repeat(90));
            for job in &jobs.results {
                println!(
                    "{:<8} {:<30} {:<14} {:<12} {}",
                    job.id,
                    job.filename,
                    format!("{} -> {}", job.original_format, job.target_format),
                    job.status,
                    job.created_at
                );
            }
            let pages = jobs
                .pages
                .map(|pages| pages.to_string())
                .unwrap_or_else(|| "?".to_string());
            println!(
                "\nPage {} of {} ({} jobs total)",
                jobs.page, pages, jobs.count
            );
        }
        OutputFormat::Json => output::print_json(&jobs)?,
    }

    Ok(())
}

/// Create a conversion job, optionally waiting for it to finish.
pub async fn jobs_convert(
    ctx: &Context,
    file: &Path,
    target_format: &str,
    wait: bool,
    interval: Duration,
) -> Result<()> {
    let upload = UploadFile::from_path(file).await?;
    let job = ctx
        .jobs
        .create(JobUpload::new(upload, target_format))
        .await?;

    if !wait {
        match ctx.format {
            OutputFormat::Text => {
                output::print_heading("Job created");
                print_job(&job);
            }
            OutputFormat::Json => output::print_json(&job)?,
        }
        return Ok(());
    }

    if ctx.format == OutputFormat::Text {
        println!("Job {} created, waiting for it to finish...", job.id);
    }

    let mut last_status = job.status.clone();
    let report = loop {
        tokio::time::sleep(interval).await;
        let report = ctx.jobs.status(job.id).await?;
        if report.status != last_status {
            debug!(job_id = job.id, status = %report.status, "Job status changed");
            if ctx.format == OutputFormat::Text {
                println!("  {}", report.status);
            }
            last_status = report.status.clone();
        }
        if report.is_terminal() {
            break report;
        }
    };

    match ctx.format {
        OutputFormat::Text => {
            output::print_heading("Job finished");
            output::print_row("ID", &report.id.to_string());
            output::print_row("Status", &report.status);
            if let Some(finished_at) = &report.finished_at {
                output::print_row("Finished", finished_at);
            }
        }
        OutputFormat::Json => output::print_json(&report)?,
    }

    Ok(())
}

/// Show the current status of a job.
pub async fn jobs_status(ctx: &Context, id: i64) -> Result<()> {
    let report = ctx.jobs.status(id).await?;

    match ctx.format {
        OutputFormat::Text => {
            output::print_row("ID", &report.id.to_string());
            output::print_row("Status", &report.status);
            output::print_row("Created", &report.created_at);
            if let Some(started_at) = &report.started_at {
                output::print_row("Started", started_at);
            }
            if let Some(finished_at) = &report.finished_at {
                output::print_row("Finished", finished_at);
            }
        }
        OutputFormat::Json => output::print_json(&report)?,
    }

    Ok(())
}

/// Show download metadata for a job.
pub async fn jobs_info(ctx: &Context, id: i64) -> Result<()> {
    let info = ctx.jobs.download_info(id).await?;

    match ctx.format {
        OutputFormat::Text => {
            output::print_row("File", &info.filename);
            output::print_row("URL", &info.url);
            output::print_row("Public URL", &info.public_url);
        }
        OutputFormat::Json => output::print_json(&info)?,
    }

    Ok(())
}

/// Download a job's converted artifact.
pub async fn jobs_download(
    ctx: &Context,
    id: i64,
    output_dir: &Path,
    filename: Option<&str>,
) -> Result<()> {
    let filename = match filename {
        Some(name) => name.to_string(),
        None => ctx.jobs.download_info(id).await?.filename,
    };

    let target = DirectorySaveTarget::new(output_dir);
    let path = ctx.jobs.download_artifact(id, &filename, &target).await?;

    output::print_success(&format!("Saved {}", path.display()), &ctx.format);
    Ok(())
}

/// `preview-<id>.<ext>`, with the extension taken from the image bytes.
fn preview_filename(id: i64, bytes: &[u8]) -> String {
    match image_extension(bytes) {
        Some(ext) => format!("preview-{}.{}", id, ext),
        None => format!("preview-{}", id),
    }
}

/// Fetch a job's preview and write it to disk.
pub async fn jobs_preview(ctx: &Context, id: i64, output_dir: &Path) -> Result<()> {
    let url = ctx.jobs.preview_blob(id).await?;
    let blobs = ctx.jobs.blobs();

    let saved = match blobs.get(&url) {
        Some(bytes) => DirectorySaveTarget::new(output_dir)
            .save(&preview_filename(id, &bytes), &bytes)
            .map_err(anyhow::Error::from),
        None => Err(anyhow::anyhow!("Preview {} is no longer available", url)),
    };
    blobs.revoke(&url);

    let path = saved?;
    output::print_success(&format!("Preview saved to {}", path.display()), &ctx.format);
    Ok(())
}
