use std::collections::BTreeMap;
use std::future::Future;
use std::io::{self, Write};
use std::path::Path;
use std::process::ExitCode;

use anyhow::{anyhow, bail, Context, Result};
use tracing::warn;

use decifracv_core::api::{ApiError, RequestDescriptor, RequestOptions};
use decifracv_core::auth::{Guarded, Route};
use decifracv_core::models::{NewUser, ResumeQuery};
use decifracv_core::App;

use crate::{Command, EXIT_LOGIN_REQUIRED};

pub async fn dispatch(mut app: App, command: Command) -> Result<ExitCode> {
    match command {
        Command::Login { email } => login(&mut app, email).await,
        Command::Logout => {
            app.session.logout()?;
            println!("Logged out.");
            Ok(ExitCode::SUCCESS)
        }
        Command::Status => status(&app),
        Command::RegisterCompany { name, email } => {
            guarded(&app, Route::RegisterCompany, || register_company(&app, name, email)).await
        }
        Command::RegisterUser { name, email } => {
            guarded(&app, Route::RegisterUser, || register_user(&app, name, email)).await
        }
        Command::History => guarded(&app, Route::History, || history(&app)).await,
        Command::Search {
            skills,
            title,
            company,
            city,
            confidence_min,
            page,
        } => {
            let query = ResumeQuery {
                page,
                skills,
                title,
                company,
                city,
                confidence_min,
                ..Default::default()
            };
            guarded(&app, Route::History, || search(&app, query)).await
        }
        Command::Parse { file } => guarded(&app, Route::Upload, || parse(&app, file)).await,
        Command::Companies => guarded(&app, Route::Companies, || companies(&app)).await,
        Command::Users => guarded(&app, Route::Users, || users(&app)).await,
        Command::Request {
            method,
            path,
            json,
            headers,
        } => raw_request(&app, method, path, json, headers).await,
    }
}

/// Run `view` if the route guard lets it render
async fn guarded<F, Fut>(app: &App, route: Route, view: F) -> Result<ExitCode>
where
    F: FnOnce() -> Fut,
    Fut: Future<Output = Result<()>>,
{
    match app.guard.guard_route(route, view) {
        Guarded::Rendered(render) => {
            render.await?;
            Ok(ExitCode::SUCCESS)
        }
        Guarded::Redirect { to } => {
            eprintln!(
                "{} requires a logged-in user (redirected to {}). Run `decifracv login` first.",
                route.path(),
                to
            );
            Ok(ExitCode::from(EXIT_LOGIN_REQUIRED))
        }
    }
}

fn prompt(label: &str, default: Option<&str>) -> Result<String> {
    match default {
        Some(d) => print!("{} [{}]: ", label, d),
        None => print!("{}: ", label),
    }
    io::stdout().flush()?;

    let mut input = String::new();
    io::stdin().read_line(&mut input)?;
    let input = input.trim();

    match (input.is_empty(), default) {
        (true, Some(d)) => Ok(d.to_string()),
        (true, None) => bail!("{} is required", label),
        (false, _) => Ok(input.to_string()),
    }
}

async fn login(app: &mut App, email: Option<String>) -> Result<ExitCode> {
    let email = match email {
        Some(e) => e,
        None => prompt("Email", app.config.last_email.as_deref())?,
    };
    let password = rpassword::prompt_password("Password: ")?;
    if password.is_empty() {
        bail!("Password is required");
    }

    match app.api.login(&email, &password).await {
        Ok(()) => {
            if let Err(e) = app.config.remember_email(&email) {
                warn!(error = %e, "Failed to save config");
            }
            println!("Login successful.");
            Ok(ExitCode::SUCCESS)
        }
        Err(ApiError::AuthenticationFailed(detail)) if !detail.trim().is_empty() => {
            Err(anyhow!("Login failed: {}", detail))
        }
        Err(ApiError::AuthenticationFailed(_)) => Err(anyhow!("Invalid email or password")),
        Err(ApiError::Gateway(e)) => {
            Err(anyhow!(e).context("Unable to reach the server. Check your connection."))
        }
        Err(e) => Err(e.into()),
    }
}

fn status(app: &App) -> Result<ExitCode> {
    let credential = app.gateway.strategy().current();
    println!("Server:        {}", app.gateway.base_url());
    println!("Session store: {}", app.session.backend());
    println!(
        "Logged in:     {}",
        if app.is_authenticated() { "yes" } else { "no" }
    );
    println!("Credential:    {}", credential.mode());
    Ok(ExitCode::SUCCESS)
}

async fn register_company(app: &App, name: String, email: String) -> Result<()> {
    if name.trim().is_empty() || email.trim().is_empty() {
        bail!("Company name and email are required");
    }
    let registration = app.api.register_company(name.trim(), email.trim()).await?;
    println!("Company registered. Keep this API key safe, it authenticates your requests:");
    println!("{}", registration.api_key);
    Ok(())
}

async fn register_user(app: &App, name: String, email: String) -> Result<()> {
    let company_key = app
        .config
        .api_key
        .clone()
        .context("DECIFRACV_API_KEY must be set to register users for a company")?;

    let password = rpassword::prompt_password("Password: ")?;
    let confirm = rpassword::prompt_password("Confirm password: ")?;
    if password.is_empty() {
        bail!("Password is required");
    }
    if password != confirm {
        bail!("Passwords do not match");
    }

    let user = NewUser {
        name,
        email,
        password,
    };
    app.api.register_user(&company_key, &user).await?;
    println!("User {} registered.", user.email);
    Ok(())
}

async fn history(app: &App) -> Result<()> {
    let resumes = app.api.history().await?;
    if resumes.is_empty() {
        println!("No resumes processed yet.");
        return Ok(());
    }
    for resume in &resumes {
        println!(
            "{:>6}  {:<32}  {:>5}  {}",
            resume.id,
            resume.display_name(),
            resume.confidence_display(),
            resume.created_at.as_deref().unwrap_or("-")
        );
    }
    Ok(())
}

async fn search(app: &App, query: ResumeQuery) -> Result<()> {
    let page = app.api.search_resumes(&query).await?;
    for resume in &page.data {
        println!(
            "{:>6}  {:<32}  {:>5}",
            resume.id,
            resume.display_name(),
            resume.confidence_display()
        );
    }
    println!("Page {} of {}", query.page, page.total_pages());
    Ok(())
}

fn content_type_for(path: &Path) -> Option<&'static str> {
    let ext = path.extension()?.to_str()?.to_ascii_lowercase();
    match ext.as_str() {
        "pdf" => Some("application/pdf"),
        "docx" => Some("application/vnd.openxmlformats-officedocument.wordprocessingml.document"),
        "doc" => Some("application/msword"),
        "txt" => Some("text/plain"),
        _ => None,
    }
}

async fn parse(app: &App, file: std::path::PathBuf) -> Result<()> {
    let data = std::fs::read(&file).with_context(|| format!("Failed to read {}", file.display()))?;
    let file_name = file
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("resume")
        .to_string();

    let parsed = app
        .api
        .parse_resume(&file_name, content_type_for(&file), data)
        .await?;
    println!("{}", serde_json::to_string_pretty(&parsed)?);
    Ok(())
}

async fn companies(app: &App) -> Result<()> {
    for company in app.api.companies().await? {
        println!(
            "{:>4}  {:<28}  {:<32}  {}",
            company.id,
            company.name,
            company.email,
            company.masked_api_key()
        );
    }
    Ok(())
}

async fn users(app: &App) -> Result<()> {
    for user in app.api.users().await? {
        println!("{:>4}  {:<28}  {}", user.id, user.name, user.email);
    }
    Ok(())
}

async fn raw_request(
    app: &App,
    method: String,
    path: String,
    json: Option<String>,
    headers: Vec<String>,
) -> Result<ExitCode> {
    let mut header_map = BTreeMap::new();
    for raw in headers {
        let (name, value) = raw
            .split_once(':')
            .ok_or_else(|| anyhow!("Header '{}' must look like 'Name: value'", raw))?;
        header_map.insert(name.trim().to_string(), value.trim().to_string());
    }
    let body = json
        .map(|raw| serde_json::from_str(&raw).context("--json is not valid JSON"))
        .transpose()?;

    let descriptor: RequestDescriptor = RequestOptions {
        path,
        method: Some(method),
        headers: header_map,
        body,
    }
    .try_into()?;

    let response = app.gateway.request(descriptor).await?;
    eprintln!("{}", response.status());
    match response.json::<serde_json::Value>() {
        Ok(value) => println!("{}", serde_json::to_string_pretty(&value)?),
        Err(_) => println!("{}", response.text()),
    }

    Ok(if response.is_success() {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}
