use loan_desk_cli::run;

#[tokio::main]
async fn main() {
    if let Err(err) = run().await {
        eprintln!("application error: {err}");
        if err.is_auth() {
            eprintln!("sign in through the web dashboard, then run the command again");
        }
        std::process::exit(1);
    }
}
