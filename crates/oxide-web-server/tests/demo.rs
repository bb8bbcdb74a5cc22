use oxide_web::{App, AppConfig, Environ, GatewayResponse, SESSION_COOKIE};
use oxide_web_server::demo::{build_app, GUESSES, MAX_NUMBER};

fn app() -> App {
    build_app(AppConfig::default().without_static_files()).unwrap()
}

fn send(app: &App, environ: Environ) -> (GatewayResponse, String) {
    let mut res = app.call(environ);
    let body = std::mem::take(&mut res.body).into_bytes().unwrap();
    (res, String::from_utf8(body).unwrap())
}

fn guess(app: &App, cookie: &str, number: u64) -> (GatewayResponse, String) {
    send(
        app,
        Environ::post("/game")
            .header("Cookie", cookie)
            .header("Content-Type", "application/x-www-form-urlencoded")
            .body(format!("number={number}")),
    )
}

/// Starts a game and returns the session cookie and secret number.
fn start(app: &App) -> (String, u64) {
    let (res, body) = send(app, Environ::get("/"));
    assert_eq!(res.status_code(), 200);
    assert!(body.contains(&format!("between 1 and {MAX_NUMBER}")));

    let cookie = res
        .headers_named("Set-Cookie")
        .find(|v| v.starts_with(SESSION_COOKIE))
        .and_then(|v| v.split(';').next())
        .unwrap()
        .to_string();
    let id = cookie.trim_start_matches("sessionid=");
    let number = app
        .sessions()
        .get(id)
        .and_then(|s| s.get::<u64>("number"))
        .unwrap();
    assert!((1..=MAX_NUMBER).contains(&number));
    (cookie, number)
}

#[test]
fn test_winning_game() {
    let app = app();
    let (cookie, number) = start(&app);

    let (_, body) = send(&app, Environ::get("/game").header("Cookie", cookie.as_str()));
    assert!(body.contains(&format!("Guesses left: {GUESSES}")));

    let (res, body) = guess(&app, &cookie, number);
    assert_eq!(res.status_code(), 200);
    assert!(body.contains("Correct!"));
}

#[test]
fn test_hints_and_running_out() {
    let app = app();
    let (cookie, number) = start(&app);

    let (wrong, hint) = if number < MAX_NUMBER {
        (number + 1, "Too Big")
    } else {
        (number - 1, "Too Small")
    };

    let (_, body) = guess(&app, &cookie, wrong);
    assert!(body.contains(hint));
    assert!(body.contains("Guesses left: 1"));

    let (_, body) = guess(&app, &cookie, wrong);
    assert!(body.contains("Guesses left: 0"));

    let (res, _) = guess(&app, &cookie, number);
    assert_eq!(res.status, "302 Found");
    assert_eq!(res.header("Location"), Some("/"));
}

#[test]
fn test_invalid_guess() {
    let app = app();
    let (cookie, _) = start(&app);
    let (res, body) = send(
        &app,
        Environ::post("/game")
            .header("Cookie", cookie.as_str())
            .header("Content-Type", "application/x-www-form-urlencoded")
            .body("number=lots"),
    );
    assert_eq!(res.status_code(), 200);
    assert!(body.contains("Invalid guess"));
}

#[test]
fn test_game_without_session_redirects() {
    let app = app();
    let (res, _) = send(&app, Environ::get("/game"));
    assert_eq!(res.status, "302 Found");
    assert_eq!(res.header("Location"), Some("/"));
}

#[test]
fn test_register_form() {
    let app = app();

    let (_, body) = send(&app, Environ::get("/register"));
    assert!(body.contains("<form method=\"post\" action=\"/register\">"));

    let (_, body) = send(
        &app,
        Environ::post("/register")
            .header("Content-Type", "application/x-www-form-urlencoded")
            .body("firstname=Ada&lastname=Lovelace"),
    );
    assert!(body.contains("Welcome Ada Lovelace"));
}

#[test]
fn test_user_routes() {
    let app = app();

    let (_, body) = send(&app, Environ::get("/user/alice"));
    assert!(body.contains("<p>alice</p>"));

    let (_, body) = send(&app, Environ::get("/user/alice/admins"));
    assert!(body.contains("<p>alice in admins</p>"));

    let (res, _) = send(&app, Environ::get("/user/alice/admins/extra"));
    assert_eq!(res.status_code(), 404);
}
