//! A number-guessing demo application.
//!
//! `/` starts a game by storing a secret number and a guess budget in the
//! session; `/game` takes guesses. The remaining routes show placeholders,
//! form input and session reads.

use anyhow::bail;
use oxide_web::{
    found, html_escape, model, App, AppConfig, Context, HandlerResult, Method, Model, Params,
    Reply, RouteDef,
};
use oxide_web::serde_json::Value;
use rand::Rng;

/// Guesses allowed per game.
pub const GUESSES: u64 = 2;

/// Largest secret number.
pub const MAX_NUMBER: u64 = 100;

fn index(ctx: &mut Context<'_>, _params: &Params) -> HandlerResult<Reply> {
    let session = ctx.session();
    session.set("number", rand::thread_rng().gen_range(1..=MAX_NUMBER));
    session.set("times", GUESSES);
    Ok(Reply::Data(Model::new()))
}

fn register(ctx: &mut Context<'_>, _params: &Params) -> HandlerResult<Reply> {
    let input = ctx.request.input(&[])?;
    let model = match (input.text("firstname"), input.text("lastname")) {
        (None, None) => model! { "register" => true },
        (firstname, lastname) => model! { "firstname" => firstname, "lastname" => lastname },
    };
    Ok(Reply::Data(model))
}

fn user(_ctx: &mut Context<'_>, params: &Params) -> HandlerResult<Reply> {
    Ok(Reply::Data(model! { "name" => &params[0] }))
}

fn comment(_ctx: &mut Context<'_>, params: &Params) -> HandlerResult<Reply> {
    Ok(Reply::Data(model! { "name" => &params[0], "group" => &params[1] }))
}

fn session(ctx: &mut Context<'_>, _params: &Params) -> HandlerResult<Reply> {
    let name = ctx.session().get::<String>("name");
    Ok(Reply::Data(model! { "name" => name }))
}

fn game(ctx: &mut Context<'_>, _params: &Params) -> HandlerResult<Reply> {
    let input = ctx.request.input(&[])?;
    let session = ctx.session();
    let times = session.get::<u64>("times").unwrap_or(0);
    let Some(number) = session.get::<u64>("number") else {
        return Err(found("/"));
    };

    let Some(guess) = input.text("number") else {
        return Ok(Reply::Data(model! { "times" => times, "status" => "" }));
    };
    let Ok(guess) = guess.trim().parse::<u64>() else {
        return Ok(Reply::Data(model! { "status" => "Invalid guess" }));
    };
    if times == 0 {
        return Err(found("/"));
    }

    let times = times - 1;
    session.set("times", times);
    let model = match guess.cmp(&number) {
        std::cmp::Ordering::Greater => {
            model! { "success" => false, "status" => "Too Big", "times" => times }
        }
        std::cmp::Ordering::Less => {
            model! { "success" => false, "status" => "Too Small", "times" => times }
        }
        std::cmp::Ordering::Equal => model! { "success" => true },
    };
    Ok(Reply::Data(model))
}

/// The demo's routes, literal routes first.
pub fn routes() -> Vec<RouteDef> {
    vec![
        RouteDef::get("/", index).view("index.html"),
        RouteDef::new("/register")
            .methods(&[Method::Get, Method::Post])
            .handler(register)
            .view("register.html"),
        RouteDef::get("/session", session).view("session.html"),
        RouteDef::new("/game")
            .methods(&[Method::Get, Method::Post])
            .handler(game)
            .view("game.html"),
        RouteDef::get("/user/<username>", user).view("name.html"),
        RouteDef::get("/user/<name>/<group>", comment).view("comment.html"),
    ]
}

/// Builds the demo application.
pub fn build_app(config: AppConfig) -> oxide_web::Result<App> {
    let mut app = App::new(config).with_renderer(render);
    app.register_module(routes())?;
    Ok(app)
}

fn field(model: &Model, key: &str) -> String {
    match model.get(key) {
        None | Some(Value::Null) => String::new(),
        Some(Value::String(s)) => html_escape(s),
        Some(other) => html_escape(&other.to_string()),
    }
}

fn flag(model: &Model, key: &str) -> Option<bool> {
    model.get(key).and_then(Value::as_bool)
}

fn page(title: &str, content: &str) -> Vec<u8> {
    format!(
        "<!DOCTYPE html>\n<html>\n<head><meta charset=\"utf-8\"><title>{title}</title>\
         <link rel=\"stylesheet\" href=\"/static/site.css\"></head>\n\
         <body>\n<h1>{title}</h1>\n{content}\n</body>\n</html>\n"
    )
    .into_bytes()
}

/// Renders the demo's views.
pub fn render(view: &str, model: &Model) -> anyhow::Result<Vec<u8>> {
    let html = match view {
        "index.html" => page(
            "Guess the number",
            &format!(
                "<p>I picked a number between 1 and {MAX_NUMBER}. \
                 You have {GUESSES} guesses.</p>\n<p><a href=\"/game\">Play</a></p>"
            ),
        ),
        "register.html" => {
            if flag(model, "register") == Some(true) {
                page(
                    "Register",
                    "<form method=\"post\" action=\"/register\">\
                     <input name=\"firstname\"><input name=\"lastname\">\
                     <button>Register</button></form>",
                )
            } else {
                page(
                    "Registered",
                    &format!(
                        "<p>Welcome {} {}</p>",
                        field(model, "firstname"),
                        field(model, "lastname")
                    ),
                )
            }
        }
        "name.html" => page("User", &format!("<p>{}</p>", field(model, "name"))),
        "comment.html" => page(
            "Comment",
            &format!(
                "<p>{} in {}</p>",
                field(model, "name"),
                field(model, "group")
            ),
        ),
        "session.html" => page(
            "Session",
            &format!("<p>name: {}</p>", field(model, "name")),
        ),
        "game.html" => {
            if flag(model, "success") == Some(true) {
                page("You win", "<p>Correct!</p><p><a href=\"/\">Again</a></p>")
            } else {
                page(
                    "Guess",
                    &format!(
                        "<p class=\"status\">{}</p><p>Guesses left: {}</p>\
                         <form method=\"post\" action=\"/game\">\
                         <input name=\"number\"><button>Guess</button></form>",
                        field(model, "status"),
                        field(model, "times")
                    ),
                )
            }
        }
        other => bail!("unknown view {other}"),
    };
    Ok(html)
}
