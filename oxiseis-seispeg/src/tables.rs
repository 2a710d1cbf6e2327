//! Fixed Huffman frequency tables.
//!
//! Each table has 257 entries: one per byte value plus the end-of-data
//! symbol at index 256. The tables are part of the wire format. Changing a
//! single entry changes the code book and breaks decoding of existing data.

/// Number of symbols in every table (256 byte values + end of data).
pub const NUM_SYMBOLS: usize = 257;

/// Index of the end-of-data symbol.
pub const END_OF_DATA: usize = 256;

/// Symbol frequencies for run-length coded, quantized LOT coefficients.
///
/// Dominated by short zero runs (bytes 1..=100) and small literals around
/// the bias value 180.
pub static DATA_FREQUENCIES: [u32; NUM_SYMBOLS] = [
    11, 9002, 3532, 2044, 1387, 1026, 803, 652, 545, 465, 404, 355,
    316, 284, 257, 234, 215, 198, 183, 171, 159, 149, 140, 132,
    125, 118, 112, 107, 102, 97, 93, 89, 85, 82, 79, 76,
    73, 70, 68, 66, 63, 61, 59, 58, 56, 54, 53, 51,
    50, 49, 47, 46, 45, 44, 43, 42, 41, 40, 39, 38,
    37, 36, 36, 35, 34, 34, 33, 32, 32, 31, 31, 30,
    29, 29, 28, 28, 28, 27, 27, 26, 26, 25, 25, 25,
    24, 24, 24, 23, 23, 23, 22, 22, 22, 21, 21, 21,
    20, 20, 20, 20, 19, 420, 35, 160, 150, 12, 3, 3,
    3, 3, 3, 3, 3, 3, 3, 3, 3, 3, 3, 3,
    3, 3, 3, 3, 3, 3, 3, 3, 4, 4, 4, 4,
    5, 5, 6, 6, 7, 8, 9, 10, 12, 14, 16, 19,
    22, 26, 31, 36, 43, 51, 61, 72, 86, 103, 123, 147,
    175, 210, 251, 301, 360, 432, 517, 620, 743, 891, 1068, 1280,
    1535, 1840, 2207, 2646, 3174, 3806, 4564, 5474, 6565, 7873, 9443, 11325,
    1, 11675, 9735, 8117, 6768, 5643, 4705, 3923, 3272, 2728, 2275, 1897,
    1582, 1320, 1101, 918, 766, 639, 533, 445, 371, 310, 259, 216,
    181, 151, 126, 106, 89, 74, 62, 52, 44, 37, 31, 27,
    23, 19, 16, 14, 12, 11, 9, 8, 7, 6, 6, 5,
    5, 4, 4, 4, 4, 3, 3, 3, 3, 3, 3, 3,
    3, 3, 3, 3, 3, 3, 3, 3, 3, 3, 3, 3,
    3, 3, 3, 2, 310,
];

/// Symbol frequencies for raw trace-header byte streams.
///
/// Header bytes are mostly zero, with small counters and sign-extended
/// negative values (0xFF) making up most of the rest.
pub static HEADER_FREQUENCIES: [u32; NUM_SYMBOLS] = [
    21000, 2400, 484, 433, 388, 348, 312, 279, 250, 224, 201, 180,
    162, 145, 130, 117, 105, 94, 85, 76, 69, 62, 56, 50,
    45, 41, 37, 33, 30, 27, 25, 23, 21, 19, 17, 16,
    14, 13, 12, 11, 11, 10, 9, 9, 8, 8, 7, 7,
    6, 6, 6, 6, 5, 5, 5, 5, 5, 5, 4, 4,
    4, 4, 4, 4, 4, 4, 4, 4, 4, 4, 4, 4,
    4, 4, 4, 4, 4, 4, 4, 4, 4, 4, 4, 4,
    4, 4, 4, 4, 4, 4, 4, 4, 4, 4, 4, 4,
    4, 4, 4, 4, 4, 4, 4, 4, 4, 4, 4, 4,
    4, 4, 4, 4, 4, 4, 4, 4, 4, 4, 4, 4,
    4, 4, 4, 4, 4, 4, 4, 4, 4, 4, 4, 4,
    4, 4, 4, 4, 4, 4, 4, 4, 4, 4, 4, 4,
    4, 4, 4, 4, 4, 4, 4, 4, 4, 4, 4, 4,
    4, 4, 4, 4, 4, 4, 4, 4, 4, 4, 4, 4,
    4, 4, 4, 4, 4, 4, 4, 4, 4, 4, 4, 4,
    4, 4, 4, 4, 4, 4, 4, 4, 4, 4, 4, 4,
    4, 4, 4, 4, 4, 4, 4, 4, 4, 4, 4, 4,
    4, 4, 4, 4, 4, 4, 4, 4, 4, 4, 4, 4,
    4, 5, 5, 5, 5, 6, 6, 6, 7, 8, 8, 9,
    10, 11, 13, 14, 16, 19, 22, 25, 29, 33, 39, 45,
    53, 62, 72, 85, 99, 117, 137, 162, 190, 224, 264, 312,
    367, 433, 511, 3100, 40,
];

/// Retuned header frequencies with a flatter tail for integer fields
/// spanning more than one byte.
pub static HEADER_IMPROVED_FREQUENCIES: [u32; NUM_SYMBOLS] = [
    26000, 3300, 1500, 732, 682, 635, 592, 551, 514, 479, 446, 416,
    387, 361, 337, 314, 293, 273, 254, 237, 221, 206, 192, 180,
    168, 156, 146, 136, 127, 119, 111, 104, 97, 91, 85, 79,
    74, 70, 65, 61, 57, 54, 50, 47, 44, 42, 39, 37,
    35, 33, 31, 29, 27, 26, 25, 23, 22, 21, 20, 19,
    18, 17, 16, 15, 15, 14, 14, 13, 12, 12, 12, 11,
    11, 10, 10, 10, 9, 9, 9, 9, 8, 8, 8, 8,
    8, 8, 7, 7, 7, 7, 7, 7, 7, 7, 7, 7,
    6, 6, 6, 6, 6, 6, 6, 6, 6, 6, 6, 6,
    6, 6, 6, 6, 6, 6, 6, 6, 7, 7, 8, 8,
    10, 11, 14, 17, 21, 28, 36, 48, 66, 48, 36, 28,
    21, 17, 14, 11, 10, 8, 8, 7, 7, 6, 6, 6,
    6, 6, 6, 6, 6, 6, 6, 6, 6, 6, 6, 6,
    6, 6, 6, 6, 6, 6, 6, 6, 6, 6, 6, 6,
    6, 6, 6, 6, 6, 6, 6, 6, 6, 6, 6, 6,
    6, 6, 6, 6, 6, 6, 6, 6, 6, 6, 6, 6,
    6, 6, 6, 6, 6, 6, 6, 6, 6, 6, 6, 6,
    6, 6, 6, 6, 6, 6, 6, 6, 6, 6, 6, 6,
    6, 6, 6, 6, 6, 6, 6, 6, 6, 6, 6, 6,
    6, 6, 6, 6, 7, 7, 7, 8, 9, 9, 10, 12,
    14, 16, 19, 23, 28, 34, 42, 53, 66, 84, 106, 134,
    171, 218, 278, 2100, 55,
];
