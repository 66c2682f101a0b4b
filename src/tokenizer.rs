use tokenizers::models::wordpiece::WordPiece;
use tokenizers::normalizers::bert::BertNormalizer;
use tokenizers::pre_tokenizers::bert::BertPreTokenizer;
use tokenizers::processors::bert::BertProcessing;
use tokenizers::{
    PaddingDirection, PaddingParams, PaddingStrategy, Tokenizer, TruncationDirection,
    TruncationParams, TruncationStrategy,
};

use crate::error::{Error, Result};
use crate::pretrained::TokenizerFile;

pub const CLS_TOKEN: &str = "[CLS]";
pub const SEP_TOKEN: &str = "[SEP]";
pub const PAD_TOKEN: &str = "[PAD]";
pub const UNK_TOKEN: &str = "[UNK]";

/// Loads a BERT tokenizer that keeps case and accents as written.
pub fn load_cased(file: &TokenizerFile) -> Result<Tokenizer> {
    let mut tokenizer = match file {
        TokenizerFile::Json(path) => Tokenizer::from_file(path)?,
        TokenizerFile::Vocab(path) => from_vocab(path.to_string_lossy().as_ref())?,
    };
    tokenizer.with_normalizer(Some(BertNormalizer::new(true, true, None, false)));
    Ok(tokenizer)
}

fn from_vocab(vocab: &str) -> Result<Tokenizer> {
    let wordpiece = WordPiece::from_file(vocab)
        .unk_token(UNK_TOKEN.to_string())
        .build()?;
    let mut tokenizer = Tokenizer::new(wordpiece);
    let cls = special_token_id(&tokenizer, CLS_TOKEN)?;
    let sep = special_token_id(&tokenizer, SEP_TOKEN)?;
    tokenizer
        .with_pre_tokenizer(Some(BertPreTokenizer))
        .with_post_processor(Some(BertProcessing::new(
            (SEP_TOKEN.to_string(), sep),
            (CLS_TOKEN.to_string(), cls),
        )));
    Ok(tokenizer)
}

fn special_token_id(tokenizer: &Tokenizer, token: &str) -> Result<u32> {
    tokenizer
        .token_to_id(token)
        .ok_or_else(|| Error::MissingSpecialToken(token.to_string()))
}

/// Pads and truncates every encoded pair to exactly `max_seq_length` tokens,
/// trimming the longer sequence of the pair first.
pub fn with_fixed_length(tokenizer: &mut Tokenizer, max_seq_length: usize) -> Result<()> {
    let pad_id = special_token_id(tokenizer, PAD_TOKEN)?;
    tokenizer
        .with_truncation(Some(TruncationParams {
            max_length: max_seq_length,
            strategy: TruncationStrategy::LongestFirst,
            stride: 0,
            direction: TruncationDirection::Right,
        }))?
        .with_padding(Some(PaddingParams {
            strategy: PaddingStrategy::Fixed(max_seq_length),
            direction: PaddingDirection::Right,
            pad_to_multiple_of: None,
            pad_id,
            pad_type_id: 0,
            pad_token: PAD_TOKEN.to_string(),
        }));
    Ok(())
}
