//! UCI wire format: parsing engine responses and formatting commands.

use std::fmt;

use shakmaty::uci::UciMove;

use crate::error::EngineError;

/// Evaluation reported on an `info` line, from the side to move's view.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Score {
    /// `score cp <n>`: centipawns.
    Cp(i32),
    /// `score mate <n>`: mate in `n` moves; negative when the side to move is mated.
    Mate(i32),
}

/// Whether a reported score is exact or only a search-window bound.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ScoreBound {
    #[default]
    Exact,
    Lower,
    Upper,
}

/// Fields of an `info` progress line. Absent fields stay `None`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Info {
    pub depth: Option<u32>,
    pub seldepth: Option<u32>,
    pub multipv: Option<u32>,
    pub nodes: Option<u64>,
    pub time_ms: Option<u64>,
    pub score: Option<Score>,
    pub bound: ScoreBound,
    /// Principal variation; `None` when the line carries no `pv`.
    pub pv: Option<Vec<UciMove>>,
}

/// A parsed line of engine output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Response {
    /// `id name <name>`.
    Id { name: String },
    /// `option name <name> type ...`.
    Option { name: String },
    /// `uciok`.
    UciOk,
    /// `readyok`.
    ReadyOk,
    /// `info ...`.
    Info(Info),
    /// `bestmove <move> [ponder <move>]`; `None` for `bestmove (none)` / `0000`.
    BestMove { best: Option<UciMove> },
    /// Anything else (banners, `id author`, `info string` is an [`Info`]).
    Other,
}

/// Parse a single line of engine output into a [`Response`].
pub fn parse_response(line: &str) -> Result<Response, EngineError> {
    let tokens: Vec<&str> = line.split_whitespace().collect();
    let Some(&head) = tokens.first() else {
        return Ok(Response::Other);
    };

    match head {
        "uciok" => Ok(Response::UciOk),
        "readyok" => Ok(Response::ReadyOk),
        "id" => Ok(parse_id(&tokens[1..])),
        "option" => Ok(parse_option_name(&tokens[1..])
            .map(|name| Response::Option { name })
            .unwrap_or(Response::Other)),
        "info" => parse_info(line, &tokens[1..]).map(Response::Info),
        "bestmove" => parse_bestmove(line, &tokens[1..]),
        _ => Ok(Response::Other),
    }
}

fn parse_id(tokens: &[&str]) -> Response {
    match tokens.split_first() {
        Some((&"name", rest)) if !rest.is_empty() => Response::Id {
            name: rest.join(" "),
        },
        _ => Response::Other,
    }
}

/// Extract the option name from the tokens after `option`.
///
/// Names may contain spaces (`Skill Level`), so everything between `name`
/// and `type` is joined.
pub fn parse_option_name(tokens: &[&str]) -> Option<String> {
    let start = tokens.iter().position(|t| *t == "name")? + 1;
    let parts: Vec<&str> = tokens[start..]
        .iter()
        .take_while(|t| **t != "type")
        .copied()
        .collect();
    if parts.is_empty() {
        None
    } else {
        Some(parts.join(" "))
    }
}

fn parse_info(line: &str, tokens: &[&str]) -> Result<Info, EngineError> {
    let mut info = Info::default();

    let mut i = 0;
    while i < tokens.len() {
        match tokens[i] {
            "depth" => {
                info.depth = Some(parse_num(line, tokens.get(i + 1), "depth")?);
                i += 2;
            }
            "seldepth" => {
                info.seldepth = Some(parse_num(line, tokens.get(i + 1), "seldepth")?);
                i += 2;
            }
            "multipv" => {
                info.multipv = Some(parse_num(line, tokens.get(i + 1), "multipv")?);
                i += 2;
            }
            "nodes" => {
                info.nodes = Some(parse_num(line, tokens.get(i + 1), "nodes")?);
                i += 2;
            }
            "time" => {
                info.time_ms = Some(parse_num(line, tokens.get(i + 1), "time")?);
                i += 2;
            }
            "score" => {
                let value = parse_num(line, tokens.get(i + 2), "score")?;
                info.score = match tokens.get(i + 1) {
                    Some(&"cp") => Some(Score::Cp(value)),
                    Some(&"mate") => Some(Score::Mate(value)),
                    other => {
                        return Err(desync(line, format!("unknown score kind {other:?}")));
                    }
                };
                i += 3;
            }
            "lowerbound" => {
                info.bound = ScoreBound::Lower;
                i += 1;
            }
            "upperbound" => {
                info.bound = ScoreBound::Upper;
                i += 1;
            }
            "pv" => {
                info.pv = Some(parse_pv(line, &tokens[i + 1..])?);
                break;
            }
            // Free text to end of line
            "string" => break,
            _ => {
                // Unknown token -- skip per UCI convention
                i += 1;
            }
        }
    }

    Ok(info)
}

fn parse_pv(line: &str, tokens: &[&str]) -> Result<Vec<UciMove>, EngineError> {
    tokens
        .iter()
        .map(|t| {
            t.trim_end_matches(['+', '#'])
                .parse::<UciMove>()
                .map_err(|_| desync(line, format!("invalid pv move \"{t}\"")))
        })
        .collect()
}

fn parse_bestmove(line: &str, tokens: &[&str]) -> Result<Response, EngineError> {
    match tokens.first() {
        None => Err(desync(line, "bestmove without a move".to_string())),
        Some(&"(none)") | Some(&"0000") => Ok(Response::BestMove { best: None }),
        Some(t) => t
            .parse::<UciMove>()
            .map(|mv| Response::BestMove { best: Some(mv) })
            .map_err(|_| desync(line, format!("invalid bestmove \"{t}\""))),
    }
}

/// Parse a numeric value following `param`.
fn parse_num<T: std::str::FromStr>(
    line: &str,
    token: Option<&&str>,
    param: &str,
) -> Result<T, EngineError> {
    let value = token.ok_or_else(|| desync(line, format!("missing {param} value")))?;
    value
        .parse()
        .map_err(|_| desync(line, format!("invalid {param} value \"{value}\"")))
}

fn desync(line: &str, reason: String) -> EngineError {
    EngineError::Desync {
        line: line.to_string(),
        reason,
    }
}

/// Parameters of a `go` command sent to the engine.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GoParams {
    /// Search to this depth only.
    pub depth: Option<u32>,
    /// Search for a mate in this many moves.
    pub mate: Option<u32>,
    /// Search this many nodes only.
    pub nodes: Option<u64>,
}

impl fmt::Display for GoParams {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("go")?;
        if let Some(depth) = self.depth {
            write!(f, " depth {depth}")?;
        }
        if let Some(mate) = self.mate {
            write!(f, " mate {mate}")?;
        }
        if let Some(nodes) = self.nodes {
            write!(f, " nodes {nodes}")?;
        }
        Ok(())
    }
}

/// `position fen <fen>`.
pub fn position_command(fen: &str) -> String {
    format!("position fen {fen}")
}

/// `setoption name <name> value <value>`.
pub fn setoption_command(name: &str, value: &str) -> String {
    format!("setoption name {name} value {value}")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn info(line: &str) -> Info {
        match parse_response(line).unwrap() {
            Response::Info(info) => info,
            other => panic!("expected Info, got {other:?}"),
        }
    }

    fn moves(tokens: &[&str]) -> Vec<UciMove> {
        tokens.iter().map(|t| t.parse().unwrap()).collect()
    }

    #[test]
    fn parse_handshake_lines() {
        assert_eq!(parse_response("uciok").unwrap(), Response::UciOk);
        assert_eq!(parse_response("readyok").unwrap(), Response::ReadyOk);
        assert_eq!(
            parse_response("id name Stockfish 16.1").unwrap(),
            Response::Id {
                name: "Stockfish 16.1".to_string()
            }
        );
        assert_eq!(
            parse_response("id author the Stockfish developers").unwrap(),
            Response::Other
        );
    }

    #[test]
    fn parse_option_with_spaces() {
        assert_eq!(
            parse_response("option name Skill Level type spin default 20 min 0 max 20").unwrap(),
            Response::Option {
                name: "Skill Level".to_string()
            }
        );
    }

    #[test]
    fn parse_info_mate_with_pv() {
        let info = info(
            "info depth 12 seldepth 4 multipv 1 score mate 2 nodes 5120 time 3 pv e7e8q b8c6 f8h6#",
        );
        assert_eq!(info.depth, Some(12));
        assert_eq!(info.seldepth, Some(4));
        assert_eq!(info.multipv, Some(1));
        assert_eq!(info.nodes, Some(5120));
        assert_eq!(info.time_ms, Some(3));
        assert_eq!(info.score, Some(Score::Mate(2)));
        assert_eq!(info.bound, ScoreBound::Exact);
        assert_eq!(info.pv, Some(moves(&["e7e8q", "b8c6", "f8h6"])));
    }

    #[test]
    fn parse_info_cp_without_pv() {
        let info = info("info depth 5 score cp -120 nodes 900");
        assert_eq!(info.score, Some(Score::Cp(-120)));
        assert_eq!(info.pv, None);
    }

    #[test]
    fn parse_info_bounds_and_unknown_tokens() {
        let info = info("info depth 9 score cp 31 lowerbound wdl 50 900 50 hashfull 3 tbhits 0");
        assert_eq!(info.bound, ScoreBound::Lower);
        assert_eq!(info.score, Some(Score::Cp(31)));
    }

    #[test]
    fn parse_info_negative_mate() {
        assert_eq!(info("info depth 7 score mate -3").score, Some(Score::Mate(-3)));
    }

    #[test]
    fn parse_info_string_is_free_text() {
        let info = info("info string NNUE evaluation using nn-5af11540bbfe.nnue depth x");
        assert_eq!(info, Info::default());
    }

    #[test]
    fn malformed_score_is_desync() {
        assert!(matches!(
            parse_response("info depth 3 score mate x"),
            Err(EngineError::Desync { .. })
        ));
        assert!(matches!(
            parse_response("info depth 3 score"),
            Err(EngineError::Desync { .. })
        ));
        assert!(matches!(
            parse_response("info depth 3 score wdl 10"),
            Err(EngineError::Desync { .. })
        ));
    }

    #[test]
    fn malformed_depth_is_desync() {
        assert!(parse_response("info depth deep").is_err());
    }

    #[test]
    fn malformed_pv_is_desync() {
        assert!(parse_response("info depth 3 score cp 1 pv e2e4 nonsense").is_err());
    }

    #[test]
    fn parse_bestmove_variants() {
        assert_eq!(
            parse_response("bestmove e2e4 ponder e7e5").unwrap(),
            Response::BestMove {
                best: Some("e2e4".parse().unwrap())
            }
        );
        assert_eq!(
            parse_response("bestmove (none)").unwrap(),
            Response::BestMove { best: None }
        );
        assert!(parse_response("bestmove").is_err());
    }

    #[test]
    fn unknown_lines_are_other() {
        assert_eq!(
            parse_response("Stockfish 16 by the Stockfish developers").unwrap(),
            Response::Other
        );
        assert_eq!(parse_response("").unwrap(), Response::Other);
    }

    #[test]
    fn go_command_formatting() {
        let go = GoParams {
            depth: Some(30),
            mate: Some(3),
            nodes: None,
        };
        assert_eq!(go.to_string(), "go depth 30 mate 3");

        let go = GoParams {
            depth: Some(10),
            mate: Some(2),
            nodes: Some(500_000),
        };
        assert_eq!(go.to_string(), "go depth 10 mate 2 nodes 500000");
        assert_eq!(GoParams::default().to_string(), "go");
    }

    #[test]
    fn option_and_position_commands() {
        assert_eq!(
            setoption_command("Hash", "64"),
            "setoption name Hash value 64"
        );
        assert_eq!(
            position_command("k7/8/1K6/8/8/8/8/2Q5 w - - 0 1"),
            "position fen k7/8/1K6/8/8/8/8/2Q5 w - - 0 1"
        );
    }
}
