mod cli;
mod consistency;
mod seeding;
mod streaming;
