//! Integration tests for the agency CLI
//!
//! These tests exercise the CLI commands end-to-end using assert_cmd.

use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use std::path::Path;
use tempfile::TempDir;

const NIT: &str = "900123456";

/// Helper to get an agency command isolated from the user's config and env
fn agency(dir: &Path) -> Command {
    let mut cmd = Command::cargo_bin("agency").unwrap();
    cmd.current_dir(dir)
        .env("XDG_CONFIG_HOME", dir.join(".xdg"))
        .env_remove("AGENCY_NIT")
        .env_remove("AGENCY_ADMIN_CODE")
        .env_remove("AGENCY_RECOMMENDER")
        .env_remove("AGENCY_AUTHOR")
        .env_remove("AGENCY_LOG");
    cmd
}

/// Helper to create a workspace in a temp directory
fn setup_workspace() -> TempDir {
    let tmp = TempDir::new().unwrap();
    agency(tmp.path()).arg("init").assert().success();
    tmp
}

fn stdout_of(cmd: &mut Command) -> String {
    let output = cmd.output().unwrap();
    assert!(
        output.status.success(),
        "command failed: {}",
        String::from_utf8_lossy(&output.stderr)
    );
    String::from_utf8_lossy(&output.stdout).trim().to_string()
}

/// Helper to add a project and return its id
fn create_project(tmp: &TempDir, title: &str, due: &str) -> String {
    stdout_of(agency(tmp.path()).args([
        "project", "new", "--nit", NIT, "--title", title, "--due", due, "-q",
    ]))
}

const QUICK_ANSWERS: &str = r#"name: Andrés Castaño
email: andres@ferreteriacastano.com
company: Ferretería Castaño
industry: retail
main_goals: [leads, digital_presence]
monthly_budget: 1M-3M
timeline: 3_months
"#;

// ============================================================================
// CLI Basic Tests
// ============================================================================

#[test]
fn test_help_displays() {
    let tmp = TempDir::new().unwrap();
    agency(tmp.path())
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("cronograma"))
        .stdout(predicate::str::contains("survey"));
}

#[test]
fn test_init_creates_workspace() {
    let tmp = TempDir::new().unwrap();
    agency(tmp.path())
        .arg("init")
        .assert()
        .success()
        .stdout(predicate::str::contains("Initialized agency workspace"));

    assert!(tmp.path().join(".agency/config.yaml").is_file());
    assert!(tmp.path().join(".agency/storage").is_dir());
    assert!(tmp.path().join("exports").is_dir());
}

#[test]
fn test_init_twice_hints_force() {
    let tmp = setup_workspace();
    agency(tmp.path())
        .arg("init")
        .assert()
        .success()
        .stdout(predicate::str::contains("already exists"))
        .stdout(predicate::str::contains("--force"));
}

#[test]
fn test_commands_outside_workspace_fail() {
    let tmp = TempDir::new().unwrap();
    agency(tmp.path())
        .args(["project", "list", "--nit", NIT])
        .assert()
        .failure()
        .stderr(predicate::str::contains("agency init"));
}

#[test]
fn test_completions_bash() {
    let tmp = TempDir::new().unwrap();
    agency(tmp.path())
        .args(["completions", "bash"])
        .assert()
        .success()
        .stdout(predicate::str::contains("agency"));
}

// ============================================================================
// Survey Tests
// ============================================================================

#[test]
fn test_survey_submit_list_and_export() {
    let tmp = setup_workspace();
    fs::write(tmp.path().join("quick.yaml"), QUICK_ANSWERS).unwrap();

    let id = stdout_of(agency(tmp.path()).args(["survey", "submit", "quick", "--file", "quick.yaml", "-q"]));
    assert!(id.starts_with("SRV-"));

    agency(tmp.path())
        .args(["survey", "list", "-f", "json"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Ferretería Castaño"));

    agency(tmp.path())
        .args(["survey", "export", &id])
        .assert()
        .success()
        .stdout(predicate::str::contains("field;value"))
        .stdout(predicate::str::contains("company;Ferretería Castaño"))
        .stdout(predicate::str::contains("main_goals;leads, digital_presence"));

    agency(tmp.path())
        .args(["survey", "show", &id[..12]])
        .assert()
        .success()
        .stdout(predicate::str::contains("QUICK SURVEY"));
}

#[test]
fn test_survey_submit_rejects_invalid_answers() {
    let tmp = setup_workspace();
    let invalid = QUICK_ANSWERS.replace("email: andres@ferreteriacastano.com\n", "");
    fs::write(tmp.path().join("quick.yaml"), invalid).unwrap();

    agency(tmp.path())
        .args(["survey", "submit", "quick", "--file", "quick.yaml"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("email"));

    agency(tmp.path())
        .args(["survey", "list", "-f", "json"])
        .assert()
        .success()
        .stdout(predicate::str::contains("[]"));
}

#[test]
fn test_survey_show_rejects_short_prefix() {
    let tmp = setup_workspace();
    fs::write(tmp.path().join("quick.yaml"), QUICK_ANSWERS).unwrap();
    agency(tmp.path())
        .args(["survey", "submit", "quick", "--file", "quick.yaml", "-q"])
        .assert()
        .success();

    agency(tmp.path())
        .args(["survey", "show", "SRV"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("No survey response matches 'SRV'"));
}

#[test]
fn test_survey_export_custom_delimiter() {
    let tmp = setup_workspace();
    fs::write(tmp.path().join("quick.yaml"), QUICK_ANSWERS).unwrap();
    let id = stdout_of(agency(tmp.path()).args(["survey", "submit", "quick", "--file", "quick.yaml", "-q"]));

    agency(tmp.path())
        .args(["survey", "export", &id, "-d", "|", "-o", "answers.txt"])
        .assert()
        .success();
    let text = fs::read_to_string(tmp.path().join("answers.txt")).unwrap();
    assert!(text.starts_with("field|value"));
    assert!(text.contains("timeline|3_months"));
}

#[test]
fn test_survey_steps() {
    let tmp = TempDir::new().unwrap();
    agency(tmp.path())
        .args(["survey", "steps", "quick"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Step 3:"))
        .stdout(predicate::str::contains("monthly_budget"));
}

// ============================================================================
// Project Tests
// ============================================================================

#[test]
fn test_project_lifecycle() {
    let tmp = setup_workspace();
    let id = create_project(&tmp, "Christmas campaign", "2030-12-01");
    assert!(id.starts_with("PRJ-"));

    agency(tmp.path())
        .args(["project", "prioritize", "--nit", NIT, &id])
        .assert()
        .success()
        .stdout(predicate::str::contains("urgent"));

    agency(tmp.path())
        .args(["project", "prioritize", "--nit", NIT, &id])
        .assert()
        .failure()
        .stderr(predicate::str::contains("cannot prioritize a project that is urgent"));

    agency(tmp.path())
        .args(["project", "complete", "--nit", NIT, &id])
        .assert()
        .success();

    agency(tmp.path())
        .args(["project", "archive", "--nit", NIT, &id])
        .assert()
        .success();

    // Archived projects leave the default list
    agency(tmp.path())
        .args(["project", "list", "--nit", NIT, "-f", "id"])
        .assert()
        .success()
        .stdout(predicate::str::contains(id.as_str()).not());

    agency(tmp.path())
        .args(["project", "list", "--nit", NIT, "--all", "-f", "id"])
        .assert()
        .success()
        .stdout(predicate::str::contains(id.as_str()));

    agency(tmp.path())
        .args(["project", "restore", "--nit", NIT, &id])
        .assert()
        .success()
        .stdout(predicate::str::contains("pending"));
}

#[test]
fn test_project_list_filters_by_status() {
    let tmp = setup_workspace();
    let urgent = create_project(&tmp, "Urgent flyer", "2030-01-10");
    let pending = create_project(&tmp, "Website refresh", "2030-02-10");
    agency(tmp.path())
        .args(["project", "prioritize", "--nit", NIT, &urgent])
        .assert()
        .success();

    let listed = stdout_of(agency(tmp.path()).args(["project", "list", "--nit", NIT, "--status", "urgent", "-f", "id"]));
    assert_eq!(listed, urgent);

    let all = stdout_of(agency(tmp.path()).args(["project", "list", "--nit", NIT, "-f", "id"]));
    let ids: Vec<&str> = all.lines().collect();
    // Sorted by due date
    assert_eq!(ids, vec![urgent.as_str(), pending.as_str()]);
}

#[test]
fn test_project_edit_keeps_status() {
    let tmp = setup_workspace();
    let id = create_project(&tmp, "Logo", "2030-03-01");
    agency(tmp.path())
        .args(["project", "prioritize", "--nit", NIT, &id])
        .assert()
        .success();

    agency(tmp.path())
        .args([
            "project", "edit", "--nit", NIT, &id, "--title", "New logo", "--due", "2030-04-15",
        ])
        .assert()
        .success();

    agency(tmp.path())
        .args(["project", "show", "--nit", NIT, &id, "-f", "json"])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"title\": \"New logo\""))
        .stdout(predicate::str::contains("\"due_date\": \"2030-04-15\""))
        .stdout(predicate::str::contains("\"status\": \"urgent\""));
}

#[test]
fn test_project_edit_requires_a_change() {
    let tmp = setup_workspace();
    let id = create_project(&tmp, "Logo", "2030-03-01");
    agency(tmp.path())
        .args(["project", "edit", "--nit", NIT, &id])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Nothing to change"));
}

#[test]
fn test_project_delete_requires_admin_code() {
    let tmp = setup_workspace();
    let id = create_project(&tmp, "Old banner", "2030-05-01");

    agency(tmp.path())
        .args(["project", "delete", "--nit", NIT, &id, "--code", "0000"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("invalid admin code"));

    agency(tmp.path())
        .args(["project", "delete", "--nit", NIT, &id, "--code", "1234"])
        .assert()
        .success();

    agency(tmp.path())
        .args(["project", "list", "--nit", NIT, "-f", "json"])
        .assert()
        .success()
        .stdout(predicate::str::contains("[]"));
}

#[test]
fn test_project_delete_uses_configured_code() {
    let tmp = setup_workspace();
    let id = create_project(&tmp, "Old banner", "2030-05-01");
    agency(tmp.path())
        .args(["config", "set", "admin_code", "7777"])
        .assert()
        .success();

    agency(tmp.path())
        .args(["project", "delete", "--nit", NIT, &id, "--code", "1234"])
        .assert()
        .failure();
    agency(tmp.path())
        .args(["project", "delete", "--nit", NIT, &id, "--code", "7777"])
        .assert()
        .success();
}

#[test]
fn test_project_unknown_id() {
    let tmp = setup_workspace();
    create_project(&tmp, "Logo", "2030-03-01");
    agency(tmp.path())
        .args(["project", "complete", "--nit", NIT, "PRJ-ZZZZZZZZ"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("no project matches"));
}

#[test]
fn test_project_invalid_nit() {
    let tmp = setup_workspace();
    agency(tmp.path())
        .args(["project", "list", "--nit", "12"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("not a valid NIT"));
}

#[test]
fn test_project_new_gets_placeholder_image() {
    let tmp = setup_workspace();
    let id = create_project(&tmp, "Summer sale", "2030-06-01");
    agency(tmp.path())
        .args(["project", "show", "--nit", NIT, &id, "-f", "json"])
        .assert()
        .success()
        .stdout(predicate::str::contains("placehold.co/600x400?text=Summer+sale"));
}

#[test]
fn test_project_export_and_import() {
    let tmp = setup_workspace();
    create_project(&tmp, "Catalog shoot", "2030-07-01");
    create_project(&tmp, "Radio spot", "2030-07-15");

    agency(tmp.path())
        .args(["project", "export", "--nit", NIT, "-o", "board.json"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Exported 2 project(s)"));

    let export = fs::read_to_string(tmp.path().join("board.json")).unwrap();
    assert!(export.contains("\"client_nit\": \"900123456\""));

    agency(tmp.path())
        .args(["project", "import", "--nit", "901234567", "board.json"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Imported 2 project(s), skipped 0"));

    // Same ids again are skipped
    agency(tmp.path())
        .args(["project", "import", "--nit", "901234567", "board.json"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Imported 0 project(s), skipped 2"));

    agency(tmp.path())
        .args(["project", "list", "--nit", "901234567", "-f", "json"])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"client_nit\": \"901234567\""))
        .stdout(predicate::str::contains("Radio spot"));
}

#[test]
fn test_project_import_rejects_invalid_entries() {
    let tmp = setup_workspace();
    fs::write(
        tmp.path().join("bad.json"),
        r#"{"projects": [{"id": "not-an-id", "title": "", "due_date": "soon"}]}"#,
    )
    .unwrap();

    agency(tmp.path())
        .args(["project", "import", "--nit", NIT, "bad.json"])
        .assert()
        .failure()
        .stdout(predicate::str::contains("Entry 1 rejected"));
}

#[test]
fn test_project_import_gives_placeholder_to_missing_image() {
    let tmp = setup_workspace();
    fs::write(
        tmp.path().join("one.json"),
        r#"[{
            "id": "PRJ-01J0000000000000000000000A",
            "title": "Menu board",
            "due_date": "2030-08-01",
            "created_at": "2030-01-01T00:00:00Z",
            "status": "pending"
        }]"#,
    )
    .unwrap();

    agency(tmp.path())
        .args(["project", "import", "--nit", NIT, "one.json"])
        .assert()
        .success();
    agency(tmp.path())
        .args(["project", "list", "--nit", NIT, "-f", "json"])
        .assert()
        .success()
        .stdout(predicate::str::contains("?text=Menu+board"));
}

// ============================================================================
// Calendar Tests
// ============================================================================

#[test]
fn test_calendar_shows_due_projects() {
    let tmp = setup_workspace();
    create_project(&tmp, "Christmas campaign", "2030-12-01");
    create_project(&tmp, "New year post", "2031-01-01");

    agency(tmp.path())
        .args(["calendar", "--nit", NIT, "--month", "2030-12", "-f", "json"])
        .assert()
        .success()
        .stdout(predicate::str::contains("2030-12-01"))
        .stdout(predicate::str::contains("Christmas campaign"))
        .stdout(predicate::str::contains("New year post").not());

    agency(tmp.path())
        .args(["calendar", "--nit", NIT, "--month", "2030-12"])
        .assert()
        .success()
        .stdout(predicate::str::contains("December 2030"))
        .stdout(predicate::str::contains("1 project(s) due"));
}

#[test]
fn test_calendar_rejects_bad_month() {
    let tmp = setup_workspace();
    agency(tmp.path())
        .args(["calendar", "--nit", NIT, "--month", "2030-13"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("YYYY-MM"));
}

// ============================================================================
// Brief Tests
// ============================================================================

#[test]
fn test_brief_from_file_seeds_project() {
    let tmp = setup_workspace();
    fs::write(
        tmp.path().join("brief.yaml"),
        r#"client_nit: "900123456"
requester: Laura Gómez
title: Christmas campaign
description: Three reels and a carousel for the Christmas season
reason: Sales peak in December
channels: [instagram, tiktok]
due_date: "2030-11-30"
"#,
    )
    .unwrap();

    let id = stdout_of(agency(tmp.path()).args(["brief", "new", "--file", "brief.yaml", "-q"]));
    assert!(id.starts_with("PRJ-"));

    agency(tmp.path())
        .args(["project", "show", "--nit", NIT, &id, "-f", "json"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Christmas campaign"))
        .stdout(predicate::str::contains("Sales peak in December"))
        .stdout(predicate::str::contains("\"status\": \"pending\""));
}

#[test]
fn test_brief_rejects_short_description() {
    let tmp = setup_workspace();
    fs::write(
        tmp.path().join("brief.yaml"),
        "client_nit: \"900123456\"\nrequester: Laura\ntitle: Flyer\ndescription: short\nreason: Promo\ndue_date: \"2030-11-30\"\n",
    )
    .unwrap();

    agency(tmp.path())
        .args(["brief", "new", "--file", "brief.yaml"])
        .assert()
        .failure();
    agency(tmp.path())
        .args(["project", "list", "--nit", NIT, "-f", "json"])
        .assert()
        .success()
        .stdout(predicate::str::contains("[]"));
}

#[test]
fn test_brief_template() {
    let tmp = TempDir::new().unwrap();
    agency(tmp.path())
        .args([
            "brief", "template", "--nit", "900.123.456-7", "--requester", "Laura", "--due", "2030-11-30",
        ])
        .assert()
        .success()
        .stdout(predicate::str::contains("client_nit: \"900123456\""))
        .stdout(predicate::str::contains("due_date: \"2030-11-30\""));
}

// ============================================================================
// Quote Tests
// ============================================================================

#[test]
fn test_quote_new_and_print() {
    let tmp = setup_workspace();
    agency(tmp.path())
        .args([
            "quote",
            "new",
            "--client",
            "Café La 14",
            "--item",
            "Logo design:1:1500000:Branding",
            "--item",
            "Posts:8:120000:Social",
        ])
        .assert()
        .success()
        .stdout(predicate::str::contains("$2.460.000"))
        .stdout(predicate::str::contains("$467.400"))
        .stdout(predicate::str::contains("$2.927.400"));

    agency(tmp.path())
        .args(["quote", "print", "-o", "quote.html"])
        .assert()
        .success();

    let html = fs::read_to_string(tmp.path().join("quote.html")).unwrap();
    assert!(html.contains("Café La 14"));
    assert!(html.contains("$2.927.400"));
    assert!(html.contains("Página 1 de 1"));
}

#[test]
fn test_quote_uses_configured_iva() {
    let tmp = setup_workspace();
    agency(tmp.path())
        .args(["config", "set", "iva_percentage", "5"])
        .assert()
        .success();

    agency(tmp.path())
        .args(["quote", "new", "--client", "Acme", "--item", "Hosting:1:100000"])
        .assert()
        .success()
        .stdout(predicate::str::contains("IVA (5%)"))
        .stdout(predicate::str::contains("$105.000"));
}

#[test]
fn test_quote_from_file() {
    let tmp = setup_workspace();
    fs::write(
        tmp.path().join("quote.yaml"),
        "client: Clínica Dental Sonrisas\nclient_nit: \"800555111\"\niva_percentage: 0\nitems:\n  - description: Landing page\n    quantity: 1\n    price: 2000000\n",
    )
    .unwrap();

    agency(tmp.path())
        .args(["quote", "new", "--file", "quote.yaml"])
        .assert()
        .success()
        .stdout(predicate::str::contains("$2.000.000"));

    agency(tmp.path())
        .args(["quote", "show", "-f", "json"])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"client_nit\": \"800555111\""));
}

#[test]
fn test_quote_rejects_bad_item() {
    let tmp = setup_workspace();
    agency(tmp.path())
        .args(["quote", "new", "--client", "Acme", "--item", "Hosting:-1:100"])
        .assert()
        .failure();
}

#[test]
fn test_quote_rejects_infinite_amount() {
    let tmp = setup_workspace();
    agency(tmp.path())
        .args(["quote", "new", "--client", "Acme", "--item", "Hosting:inf:100"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("too large"));
}

#[test]
fn test_quote_print_without_quote() {
    let tmp = setup_workspace();
    agency(tmp.path())
        .args(["quote", "print"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("No quote has been prepared"));
}

// ============================================================================
// Recommendation Tests
// ============================================================================

#[test]
fn test_recommend_offline() {
    let tmp = TempDir::new().unwrap();
    agency(tmp.path())
        .args([
            "recommend",
            "-f",
            "json",
            "We want more Instagram followers and a new logo for our bakery's social networks",
        ])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"recommended_services\""))
        .stdout(predicate::str::contains("social_media"))
        .stdout(predicate::str::contains("branding"));
}

#[test]
fn test_recommend_empty_needs() {
    let tmp = TempDir::new().unwrap();
    agency(tmp.path())
        .args(["recommend", "   "])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Describe what the business needs"));
}

#[cfg(unix)]
#[test]
fn test_recommend_backend_failure_is_generic() {
    let tmp = TempDir::new().unwrap();
    agency(tmp.path())
        .env("AGENCY_RECOMMENDER", "cat > /dev/null; echo 'HTTP 500 upstream' >&2; exit 3")
        .args(["recommend", "we need a website"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Please try again"))
        .stderr(predicate::str::contains("HTTP 500").not());
}

#[cfg(unix)]
#[test]
fn test_recommend_command_backend() {
    let tmp = TempDir::new().unwrap();
    agency(tmp.path())
        .env(
            "AGENCY_RECOMMENDER",
            r#"cat > /dev/null; echo '{"title":"Web presence","summary":"Build a site.","recommended_services":["web_design"]}'"#,
        )
        .args(["recommend", "-f", "id", "we have no website"])
        .assert()
        .success()
        .stdout("web_design\n");
}

// ============================================================================
// Client and Gallery Tests
// ============================================================================

#[test]
fn test_client_show_normalizes_nit() {
    let tmp = TempDir::new().unwrap();
    agency(tmp.path())
        .args(["client", "show", "900.123.456-7"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Panadería El Trigal"));
}

#[test]
fn test_client_show_unknown() {
    let tmp = TempDir::new().unwrap();
    agency(tmp.path())
        .args(["client", "show", "123456789"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("No client registered"));
}

#[test]
fn test_gallery_access_flow() {
    let tmp = setup_workspace();

    agency(tmp.path())
        .args(["gallery", "show", "trigal-navidad"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("locked"));

    agency(tmp.path())
        .args(["gallery", "unlock", "trigal-navidad", "--code", "WRONG"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Invalid access code"));

    agency(tmp.path())
        .args(["gallery", "unlock", "trigal-navidad", "--code", "trigal25"])
        .assert()
        .success();

    agency(tmp.path())
        .args(["gallery", "show", "trigal-navidad"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Panettone close-up"));

    agency(tmp.path())
        .args(["gallery", "lock", "trigal-navidad"])
        .assert()
        .success();
    agency(tmp.path())
        .args(["gallery", "show", "trigal-navidad"])
        .assert()
        .failure();
}

#[test]
fn test_gallery_list_hides_codes() {
    let tmp = setup_workspace();
    agency(tmp.path())
        .args(["gallery", "list", "-f", "json"])
        .assert()
        .success()
        .stdout(predicate::str::contains("trigal-navidad"))
        .stdout(predicate::str::contains("TRIGAL25").not());
}

// ============================================================================
// Config Tests
// ============================================================================

#[test]
fn test_config_set_show_unset() {
    let tmp = setup_workspace();
    agency(tmp.path())
        .args(["config", "set", "items_per_page", "20"])
        .assert()
        .success();
    agency(tmp.path())
        .args(["config", "show", "items_per_page"])
        .assert()
        .success()
        .stdout("20\n");
    agency(tmp.path())
        .args(["config", "unset", "items_per_page"])
        .assert()
        .success();
    agency(tmp.path())
        .args(["config", "show", "items_per_page"])
        .assert()
        .failure();
}

#[test]
fn test_config_rejects_unknown_key() {
    let tmp = setup_workspace();
    agency(tmp.path())
        .args(["config", "set", "editor", "vim"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Unknown configuration key"));
}
